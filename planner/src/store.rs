use std::{
    fs,
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Mutex,
};

use shared::Coordinate;

use crate::error::StoreError;

pub const ROUTE_KEY: &str = "route";
pub const USER_LOCATION_KEY: &str = "userLocation";

/// Key-value persistence for the waypoint list and the last known position.
///
/// Both values are stored as `[lat, lng]` JSON pairs. `Ok(None)` means the
/// key has never been written (or was cleared).
pub trait WaypointStore: Send + Sync {
    fn load(&self) -> Result<Option<Vec<Coordinate>>, StoreError>;
    fn save(&self, waypoints: &[Coordinate]) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
    fn load_location(&self) -> Result<Option<Coordinate>, StoreError>;
    fn save_location(&self, location: Coordinate) -> Result<(), StoreError>;
}

fn encode_route(waypoints: &[Coordinate]) -> Result<String, StoreError> {
    let pairs: Vec<[f64; 2]> = waypoints.iter().map(|&c| c.into()).collect();
    Ok(serde_json::to_string(&pairs)?)
}

fn decode_route(raw: &str) -> Result<Vec<Coordinate>, StoreError> {
    let pairs: Vec<[f64; 2]> = serde_json::from_str(raw)?;
    Ok(pairs.into_iter().map(Coordinate::from).collect())
}

fn encode_location(location: Coordinate) -> Result<String, StoreError> {
    Ok(serde_json::to_string(&<[f64; 2]>::from(location))?)
}

fn decode_location(raw: &str) -> Result<Coordinate, StoreError> {
    let pair: [f64; 2] = serde_json::from_str(raw)?;
    Ok(pair.into())
}

/// One `<key>.json` file per key under a data directory.
///
/// Reads and writes are blocking `std::fs` calls. The planner makes them while
/// holding its state lock, so each mutation pays for one small file write.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_key(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_key(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path_for(key))?;
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl WaypointStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Coordinate>>, StoreError> {
        self.read_key(ROUTE_KEY)?
            .map(|raw| decode_route(&raw))
            .transpose()
    }

    fn save(&self, waypoints: &[Coordinate]) -> Result<(), StoreError> {
        self.write_key(ROUTE_KEY, &encode_route(waypoints)?)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.remove_key(ROUTE_KEY)
    }

    fn load_location(&self) -> Result<Option<Coordinate>, StoreError> {
        self.read_key(USER_LOCATION_KEY)?
            .map(|raw| decode_location(&raw))
            .transpose()
    }

    fn save_location(&self, location: Coordinate) -> Result<(), StoreError> {
        self.write_key(USER_LOCATION_KEY, &encode_location(location)?)
    }
}

/// Keeps the serialized strings in memory, so parsing behaves exactly like
/// the file store.
#[derive(Default)]
pub struct MemoryStore {
    route: Mutex<Option<String>>,
    location: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw strings, as if written by an earlier session.
    pub fn with_raw(route: Option<&str>, location: Option<&str>) -> Self {
        Self {
            route: Mutex::new(route.map(str::to_string)),
            location: Mutex::new(location.map(str::to_string)),
        }
    }

    pub fn raw_route(&self) -> Option<String> {
        lock(&self.route).ok().and_then(|slot| slot.clone())
    }
}

fn lock<T>(slot: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StoreError> {
    slot.lock()
        .map_err(|_| io::Error::other("memory store lock poisoned").into())
}

impl WaypointStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<Coordinate>>, StoreError> {
        lock(&self.route)?
            .as_deref()
            .map(decode_route)
            .transpose()
    }

    fn save(&self, waypoints: &[Coordinate]) -> Result<(), StoreError> {
        *lock(&self.route)? = Some(encode_route(waypoints)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *lock(&self.route)? = None;
        Ok(())
    }

    fn load_location(&self) -> Result<Option<Coordinate>, StoreError> {
        lock(&self.location)?
            .as_deref()
            .map(decode_location)
            .transpose()
    }

    fn save_location(&self, location: Coordinate) -> Result<(), StoreError> {
        *lock(&self.location)? = Some(encode_location(location)?);
        Ok(())
    }
}
