use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use shared::{
    Coordinate, RouteStatus, RouteView,
    geo::{estimated_duration_hours, format_duration, km_to_miles, total_distance_km},
};
use tokio::sync::{Mutex, MutexGuard};

use crate::routing::RouteProvider;
use crate::store::WaypointStore;

/// User intents coming from the map widget and the device geolocation watch.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MapClicked(Coordinate),
    MarkerClicked(usize),
    LocationFound(Coordinate),
    LocationError(String),
    Reset,
}

/// What a mutation ended up doing to the curved path.
#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// Nothing changed (protected index, out of bounds, ignored event).
    Unchanged,
    /// Fewer than two waypoints: the path mirrors the waypoints, no request.
    Settled,
    /// The provider's path was committed.
    Routed,
    /// The provider failed; the mutation was rolled back.
    Failed(String),
    /// A newer mutation happened while the request was in flight.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
pub struct PlannerSettings {
    pub cycling_speed_kmh: f64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            cycling_speed_kmh: 15.0,
        }
    }
}

#[derive(Debug, Default)]
struct RouteState {
    waypoints: Vec<Coordinate>,
    curved_path: Vec<Coordinate>,
    user_location: Option<Coordinate>,
    error: Option<String>,
    loading: bool,
    /// Whether a route key exists in the store; gates first-run seeding.
    route_persisted: bool,
    /// The waypoints `curved_path` was derived from. A failed request rolls
    /// the list back to this, so waypoints and path never disagree.
    routed_waypoints: Vec<Coordinate>,
}

impl RouteState {
    fn status(&self) -> RouteStatus {
        if self.loading {
            RouteStatus::Routing
        } else if self.error.is_some() {
            RouteStatus::Failed
        } else {
            match self.waypoints.len() {
                0 => RouteStatus::Empty,
                1 => RouteStatus::Single,
                _ => RouteStatus::Routed,
            }
        }
    }

    fn view(&self, speed_kmh: f64) -> RouteView {
        let distance_km = total_distance_km(&self.curved_path);
        RouteView {
            status: self.status(),
            waypoints: self.waypoints.clone(),
            curved_path: self.curved_path.clone(),
            user_location: self.user_location,
            distance_km,
            distance_miles: km_to_miles(distance_km),
            estimated_duration: format_duration(estimated_duration_hours(distance_km, speed_kmh)),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// Owns the user's waypoints and the road-following path derived from them.
///
/// Every mutation persists the waypoints and re-derives the path. Routing
/// requests are tagged with a token; only the response for the latest token
/// is ever committed, older ones are dropped on arrival. The state lock is
/// never held while waiting on the provider.
pub struct RoutePlanner {
    provider: Arc<dyn RouteProvider>,
    store: Arc<dyn WaypointStore>,
    settings: PlannerSettings,
    state: Mutex<RouteState>,
    latest_token: AtomicU64,
}

impl RoutePlanner {
    /// Rebuilds the planner from whatever the store holds. Unreadable data is
    /// logged and treated as absent. The path starts as the raw waypoints;
    /// call [`RoutePlanner::recompute`] to route them.
    pub fn restore(
        provider: Arc<dyn RouteProvider>,
        store: Arc<dyn WaypointStore>,
        settings: PlannerSettings,
    ) -> Self {
        let (waypoints, route_persisted) = match store.load() {
            Ok(Some(waypoints)) => (waypoints, true),
            Ok(None) => (Vec::new(), false),
            Err(err) => {
                tracing::warn!("ignoring unreadable stored route: {err}");
                (Vec::new(), false)
            }
        };
        let user_location = store.load_location().unwrap_or_else(|err| {
            tracing::warn!("ignoring unreadable stored location: {err}");
            None
        });
        tracing::info!(
            "restored {} waypoint(s), user location {}",
            waypoints.len(),
            if user_location.is_some() { "known" } else { "unknown" }
        );

        let state = RouteState {
            curved_path: waypoints.clone(),
            routed_waypoints: waypoints.clone(),
            waypoints,
            user_location,
            route_persisted,
            ..Default::default()
        };

        Self {
            provider,
            store,
            settings,
            state: Mutex::new(state),
            latest_token: AtomicU64::new(0),
        }
    }

    pub async fn handle(&self, event: MapEvent) -> Derivation {
        match event {
            MapEvent::MapClicked(coord) => self.add_waypoint(coord).await,
            MapEvent::MarkerClicked(index) => self.remove_waypoint(index).await,
            MapEvent::LocationFound(coord) => self.update_location(coord).await,
            MapEvent::LocationError(message) => {
                tracing::warn!("geolocation error: {message}");
                Derivation::Unchanged
            }
            MapEvent::Reset => self.reset().await,
        }
    }

    pub async fn snapshot(&self) -> RouteView {
        self.state.lock().await.view(self.settings.cycling_speed_kmh)
    }

    /// Re-derives the path for the current waypoints without mutating them.
    pub async fn recompute(&self) -> Derivation {
        let state = self.state.lock().await;
        self.derive(state).await
    }

    pub async fn add_waypoint(&self, coord: Coordinate) -> Derivation {
        let mut state = self.state.lock().await;
        state.waypoints.push(coord);
        state.error = None;
        self.persist(&mut state);
        tracing::debug!(
            "added waypoint ({:.5}, {:.5}), now {}",
            coord.lat,
            coord.lon,
            state.waypoints.len()
        );
        self.derive(state).await
    }

    /// Index 0 is the current-location entry and cannot be removed.
    pub async fn remove_waypoint(&self, index: usize) -> Derivation {
        let mut state = self.state.lock().await;
        if index == 0 || index >= state.waypoints.len() {
            tracing::debug!("ignoring removal of waypoint {index}");
            return Derivation::Unchanged;
        }
        let removed = state.waypoints.remove(index);
        self.persist(&mut state);
        tracing::debug!(
            "removed waypoint {index} ({:.5}, {:.5}), now {}",
            removed.lat,
            removed.lon,
            state.waypoints.len()
        );
        self.derive(state).await
    }

    /// Collapses the route to the user's position, or to nothing if unknown.
    pub async fn reset(&self) -> Derivation {
        let mut state = self.state.lock().await;
        self.invalidate_in_flight();
        state.waypoints = state.user_location.into_iter().collect();
        state.curved_path = state.waypoints.clone();
        state.routed_waypoints = state.waypoints.clone();
        state.error = None;
        state.loading = false;
        self.persist(&mut state);
        tracing::info!("route reset to {} waypoint(s)", state.waypoints.len());
        Derivation::Settled
    }

    /// Remembers the device position. Seeds the route only on first run,
    /// never over a persisted or user-built route.
    pub async fn update_location(&self, location: Coordinate) -> Derivation {
        let mut state = self.state.lock().await;
        state.user_location = Some(location);
        if let Err(err) = self.store.save_location(location) {
            tracing::warn!("failed to persist user location: {err}");
        }

        if state.route_persisted || !state.waypoints.is_empty() {
            return Derivation::Unchanged;
        }

        tracing::info!(
            "seeding route with current location ({:.5}, {:.5})",
            location.lat,
            location.lon
        );
        state.waypoints = vec![location];
        self.persist(&mut state);
        self.derive(state).await
    }

    /// Routes the current waypoints and commits the result. On failure the
    /// waypoints return to the list behind the displayed path. That undoes the
    /// triggering mutation plus any earlier one whose request was superseded
    /// before it could commit.
    async fn derive(&self, mut state: MutexGuard<'_, RouteState>) -> Derivation {
        if state.waypoints.len() < 2 {
            self.invalidate_in_flight();
            state.curved_path = state.waypoints.clone();
            state.routed_waypoints = state.waypoints.clone();
            state.loading = false;
            state.error = None;
            return Derivation::Settled;
        }

        let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        let waypoints = state.waypoints.clone();
        state.loading = true;
        drop(state);

        tracing::debug!("routing request #{token} for {} waypoints", waypoints.len());
        let result = self.provider.fetch_path(&waypoints).await;

        let mut state = self.state.lock().await;
        if self.latest_token.load(Ordering::SeqCst) != token {
            tracing::debug!("discarding stale routing response #{token}");
            return Derivation::Superseded;
        }
        state.loading = false;

        match result {
            Ok(path) => {
                tracing::debug!("committing path with {} points", path.len());
                state.curved_path = path;
                state.routed_waypoints = waypoints;
                state.error = None;
                Derivation::Routed
            }
            Err(err) => {
                tracing::warn!("{err}, rolling back");
                let message = err.message().to_string();
                state.error = Some(message.clone());
                if state.waypoints != state.routed_waypoints {
                    tracing::debug!(
                        "restoring {} waypoint(s) behind the current path",
                        state.routed_waypoints.len()
                    );
                    state.waypoints = state.routed_waypoints.clone();
                    self.persist(&mut state);
                }
                Derivation::Failed(message)
            }
        }
    }

    fn invalidate_in_flight(&self) {
        self.latest_token.fetch_add(1, Ordering::SeqCst);
    }

    /// An empty route removes the key so the next location fix can seed it.
    fn persist(&self, state: &mut RouteState) {
        let result = if state.waypoints.is_empty() {
            self.store.clear()
        } else {
            self.store.save(&state.waypoints)
        };
        match result {
            Ok(()) => state.route_persisted = !state.waypoints.is_empty(),
            Err(err) => tracing::warn!("failed to persist waypoints: {err}"),
        }
    }
}
