use crate::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const MILES_PER_KM: f64 = 0.621371;

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn total_distance_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn km_to_miles(km: f64) -> f64 {
    km * MILES_PER_KM
}

/// Callers must pass a positive speed.
pub fn estimated_duration_hours(distance_km: f64, speed_kmh: f64) -> f64 {
    distance_km / speed_kmh
}

/// Rounds to the nearest minute: `"1h 30m"` or `"15m"`.
pub fn format_duration(hours: f64) -> String {
    let mins = (hours * 60.0).round() as i64;
    let h = mins / 60;
    let m = mins % 60;
    if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The road-following path a provider returns for two Exeter clicks.
    fn exeter_ride() -> Vec<Coordinate> {
        vec![
            Coordinate::new(50.7, -3.5),
            Coordinate::new(50.71, -3.52),
            Coordinate::new(50.72, -3.55),
        ]
    }

    #[test]
    fn test_exeter_ride_distance() {
        let ride = exeter_ride();
        let total = total_distance_km(&ride);
        assert!((total - 4.18).abs() < 0.01, "{total}");
        assert_eq!(
            total,
            haversine_km(ride[0], ride[1]) + haversine_km(ride[1], ride[2])
        );
    }

    #[test]
    fn test_curved_path_is_longer_than_straight_line() {
        let ride = exeter_ride();
        assert!(total_distance_km(&ride) > haversine_km(ride[0], ride[2]));
    }

    #[test]
    fn test_route_without_segments_has_no_distance() {
        assert_eq!(total_distance_km(&[]), 0.0);
        assert_eq!(total_distance_km(&exeter_ride()[..1]), 0.0);
        let home = Coordinate::new(50.7, -3.5);
        assert_eq!(total_distance_km(&[home, home]), 0.0);
    }

    #[test]
    fn test_km_to_miles() {
        assert_eq!(km_to_miles(0.0), 0.0);
        assert!((km_to_miles(1.0) - 0.621371).abs() < 1e-12);
        assert!((km_to_miles(total_distance_km(&exeter_ride())) - 2.60).abs() < 0.01);
    }

    #[test]
    fn test_exeter_ride_takes_seventeen_minutes() {
        let hours = estimated_duration_hours(total_distance_km(&exeter_ride()), 15.0);
        assert_eq!(format_duration(hours), "17m");
        assert_eq!(estimated_duration_hours(30.0, 15.0), 2.0);
        assert!(estimated_duration_hours(1.0, 0.0).is_infinite());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1.5), "1h 30m");
        assert_eq!(format_duration(0.25), "15m");
        assert_eq!(format_duration(0.0), "0m");
        assert_eq!(format_duration(2.0), "2h 0m");
        // 59.6 minutes rounds up into the hour
        assert_eq!(format_duration(59.6 / 60.0), "1h 0m");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Clicks within cycling range of each other (south-west England).
        fn nearby_click() -> impl Strategy<Value = Coordinate> {
            (49.9..=51.5, -5.7..=-2.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
        }

        fn ride() -> impl Strategy<Value = Vec<Coordinate>> {
            prop::collection::vec(nearby_click(), 2..12)
        }

        /// Reads `"1h 30m"` / `"15m"` back into whole minutes.
        fn parse_minutes(text: &str) -> i64 {
            let (hours, minutes) = match text.split_once("h ") {
                Some((h, m)) => (h.parse::<i64>().unwrap(), m),
                None => (0, text),
            };
            hours * 60 + minutes.trim_end_matches('m').parse::<i64>().unwrap()
        }

        proptest! {
            #[test]
            fn prop_path_never_shorter_than_straight_line(path in ride()) {
                let chord = haversine_km(path[0], path[path.len() - 1]);
                prop_assert!(total_distance_km(&path) + 1e-9 >= chord);
            }

            #[test]
            fn prop_detour_never_shortens_the_path(
                path in ride(),
                detour in nearby_click(),
                at in any::<prop::sample::Index>()
            ) {
                let mut longer = path.clone();
                longer.insert(at.index(path.len() + 1), detour);
                prop_assert!(total_distance_km(&longer) + 1e-9 >= total_distance_km(&path));
            }

            #[test]
            fn prop_reversed_path_has_same_length(path in ride()) {
                let reversed: Vec<Coordinate> = path.iter().rev().copied().collect();
                prop_assert!((total_distance_km(&path) - total_distance_km(&reversed)).abs() < 1e-9);
            }

            #[test]
            fn prop_miles_scale_linearly(a in 0.0f64..500.0, b in 0.0f64..500.0) {
                prop_assert!((km_to_miles(a + b) - km_to_miles(a) - km_to_miles(b)).abs() < 1e-9);
                prop_assert!(km_to_miles(a) <= a);
            }

            #[test]
            fn prop_whole_minutes_format_back_to_themselves(minutes in 0i64..10_000) {
                let text = format_duration(minutes as f64 / 60.0);
                prop_assert_eq!(parse_minutes(&text), minutes);
            }

            #[test]
            fn prop_format_duration_minutes_below_sixty(hours in 0.0f64..100.0) {
                let text = format_duration(hours);
                let minutes: i64 = text
                    .trim_end_matches('m')
                    .rsplit(' ')
                    .next()
                    .unwrap()
                    .parse()
                    .unwrap();
                prop_assert!((0..60).contains(&minutes));
            }
        }
    }
}
