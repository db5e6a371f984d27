mod env_store;
mod run;
mod settings;

pub use env_store::{EnvStore, PersistenceWarning, address_key, persist_entry};
pub use run::{Overrides, RunConfig};
pub use settings::AppConfig;
