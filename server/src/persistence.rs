//! Durable entity persistence: users, API keys, submarines, and fuelers
//! survive a restart; torpedoes do not (they are transient munitions, never
//! written to disk even though they live in the same in-memory `World`).
//!
//! Grounded on `PlayerProfiles::load_profile`/`save_profile` in the teacher:
//! bincode-encode to a temp file, `rename` over the real path so a crash
//! mid-write never corrupts the previous save, and reject (rather than
//! silently discard) a file whose version doesn't match what this binary
//! expects.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use subsim_shared::ids::{ApiKeyId, FuelerId, SubId, UserId};
use subsim_shared::world::{ApiKey, Fueler, Submarine, User, World};

const CURRENT_VERSION: u32 = 1;
const FILE_NAME: &str = "world.bincode";

#[derive(Debug, Serialize, Deserialize)]
struct DurableState {
    version: u32,
    users: HashMap<UserId, User>,
    api_keys: HashMap<ApiKeyId, ApiKey>,
    subs: HashMap<SubId, Submarine>,
    fuelers: HashMap<FuelerId, Fueler>,
}

impl DurableState {
    fn from_world(world: &World) -> Self {
        Self {
            version: CURRENT_VERSION,
            users: world.users.clone(),
            api_keys: world.api_keys.clone(),
            subs: world.subs.clone(),
            fuelers: world.fuelers.clone(),
        }
    }

    fn apply_to(self, world: &mut World) {
        world.users = self.users;
        world.api_keys = self.api_keys;
        world.subs = self.subs;
        world.fuelers = self.fuelers;
    }
}

pub struct Persistence {
    dir: PathBuf,
}

impl Persistence {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(FILE_NAME)
    }

    /// Load durable entities into `world` if a save file exists. A
    /// version mismatch moves the file aside as `<name>.bak-v<old>` and
    /// starts fresh rather than attempting to migrate or silently discard
    /// the player's progress.
    pub fn load(&self, world: &mut World) -> std::io::Result<()> {
        let path = self.path();
        if !path.exists() {
            info!("no existing save at {:?}, starting fresh", path);
            return Ok(());
        }
        let bytes = fs::read(&path)?;
        match bincode::deserialize::<DurableState>(&bytes) {
            Ok(state) if state.version == CURRENT_VERSION => {
                info!(
                    users = state.users.len(),
                    subs = state.subs.len(),
                    "loaded save from {:?}",
                    path
                );
                state.apply_to(world);
                Ok(())
            }
            Ok(state) => {
                let backup = self.dir.join(format!("{FILE_NAME}.bak-v{}", state.version));
                warn!(
                    "save version {} != expected {}, backing up to {:?} and starting fresh",
                    state.version, CURRENT_VERSION, backup
                );
                fs::rename(&path, &backup)?;
                Ok(())
            }
            Err(e) => {
                error!("failed to decode save at {:?}: {e}; leaving file in place", path);
                Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }
        }
    }

    /// Atomically write durable entities: encode to a temp file in the same
    /// directory, then rename over the real path. The rename is atomic on
    /// POSIX filesystems, so a crash mid-write leaves the previous save
    /// intact.
    pub fn save(&self, world: &World) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let state = DurableState::from_world(world);
        let bytes = bincode::serialize(&state)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let tmp_path = self.dir.join(format!("{FILE_NAME}.tmp"));
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, self.path())?;
        Ok(())
    }
}

pub fn default_data_dir() -> PathBuf {
    Path::new("server_data").to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use subsim_shared::ids::UserId;
    use subsim_shared::world::User;

    #[test]
    fn save_then_load_round_trips_users() {
        let dir = std::env::temp_dir().join(format!("subsim-test-{}", UserId::new().0));
        let persistence = Persistence::new(dir.clone());

        let mut world = World::new();
        let user = User {
            id: UserId::new(),
            username: "alice".into(),
            password_hash: "hash".into(),
            is_admin: false,
            created_at: 0.0,
        };
        world.users.insert(user.id, user.clone());

        persistence.save(&world).unwrap();

        let mut loaded = World::new();
        persistence.load(&mut loaded).unwrap();
        assert_eq!(loaded.users.get(&user.id).unwrap().username, "alice");

        let _ = fs::remove_dir_all(&dir);
    }
}
