use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use shared::{Coordinate, RouteView};

use crate::error::ExportError;

const CREATOR: &str = "cycle-route-planner";

/// Encodes a route snapshot as GPX 1.1, base64 wrapped.
///
/// The clicked waypoints become `<wpt>` markers ("Start", "Stop 1", ...) and
/// the road-following path becomes a single-segment track whose name and
/// description carry the distance and riding time shown in the planner.
pub fn encode_route_as_gpx(view: &RouteView) -> Result<String, ExportError> {
    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        waypoints: view
            .waypoints
            .iter()
            .enumerate()
            .map(|(index, &coord)| stop_marker(index, coord))
            .collect(),
        tracks: vec![ride_track(view)],
        ..Default::default()
    };

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn stop_marker(index: usize, coord: Coordinate) -> Waypoint {
    let mut marker = to_waypoint(coord);
    marker.name = Some(if index == 0 {
        "Start".to_string()
    } else {
        format!("Stop {index}")
    });
    marker
}

fn ride_track(view: &RouteView) -> Track {
    let mut segment = TrackSegment::new();
    segment
        .points
        .extend(view.curved_path.iter().copied().map(to_waypoint));

    Track {
        name: Some(format!("Cycle route, {:.1} km", view.distance_km)),
        description: Some(format!(
            "{:.2} km ({:.2} mi), about {} by bike",
            view.distance_km, view.distance_miles, view.estimated_duration
        )),
        type_: Some("cycling".into()),
        segments: vec![segment],
        ..Default::default()
    }
}

// geo-types points are (x = lon, y = lat)
fn to_waypoint(coord: Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

#[cfg(test)]
mod tests {
    use shared::{
        RouteStatus,
        geo::{estimated_duration_hours, format_duration, km_to_miles, total_distance_km},
    };

    use super::*;

    fn exeter_view() -> RouteView {
        let waypoints = vec![Coordinate::new(50.7, -3.5), Coordinate::new(50.72, -3.55)];
        let curved_path = vec![
            Coordinate::new(50.7, -3.5),
            Coordinate::new(50.71, -3.52),
            Coordinate::new(50.72, -3.55),
        ];
        let distance_km = total_distance_km(&curved_path);
        RouteView {
            status: RouteStatus::Routed,
            waypoints,
            curved_path,
            user_location: None,
            distance_km,
            distance_miles: km_to_miles(distance_km),
            estimated_duration: format_duration(estimated_duration_hours(distance_km, 15.0)),
            loading: false,
            error: None,
        }
    }

    fn decode(encoded: String) -> Gpx {
        let xml = BASE64.decode(encoded).unwrap();
        gpx::read(xml.as_slice()).unwrap()
    }

    #[test]
    fn test_clicked_waypoints_become_named_markers() {
        let view = exeter_view();
        let parsed = decode(encode_route_as_gpx(&view).unwrap());

        let markers: Vec<(Option<&str>, Coordinate)> = parsed
            .waypoints
            .iter()
            .map(|w| {
                let point = w.point();
                (w.name.as_deref(), Coordinate::new(point.y(), point.x()))
            })
            .collect();
        assert_eq!(
            markers,
            vec![
                (Some("Start"), view.waypoints[0]),
                (Some("Stop 1"), view.waypoints[1]),
            ]
        );
    }

    #[test]
    fn test_track_follows_the_curved_path() {
        let view = exeter_view();
        let parsed = decode(encode_route_as_gpx(&view).unwrap());

        assert_eq!(parsed.tracks.len(), 1);
        let points: Vec<Coordinate> = parsed.tracks[0].segments[0]
            .points
            .iter()
            .map(|w| Coordinate::new(w.point().y(), w.point().x()))
            .collect();
        assert_eq!(points, view.curved_path);
    }

    #[test]
    fn test_track_metadata_carries_distance_and_duration() {
        let view = exeter_view();
        let parsed = decode(encode_route_as_gpx(&view).unwrap());
        let track = &parsed.tracks[0];

        assert_eq!(track.name.as_deref(), Some("Cycle route, 4.2 km"));
        assert_eq!(view.estimated_duration, "17m");
        assert_eq!(
            track.description.as_deref(),
            Some(
                format!(
                    "4.18 km ({:.2} mi), about 17m by bike",
                    view.distance_miles
                )
                .as_str()
            )
        );
        assert_eq!(track.type_.as_deref(), Some("cycling"));
    }
}
