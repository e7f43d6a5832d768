//! Terminal interface and command line front ends.

pub mod app;
pub mod cli;
pub mod components;

use crate::app::persistence::TreeRepository;
use crate::app::session::Session;
use crate::infra::config::Config;
use crate::infra::storage::FileStore;

/// Open a session over the configured storage directory.
pub fn open_session<P>(config: &Config, previews: P) -> Session<FileStore, P>
where
    P: crate::app::preview::PreviewProvider,
{
    let store = FileStore::new(config.storage.dir()).with_quota(config.storage.quota_bytes());
    tracing::info!(dir = %store.dir().display(), "opening storage");
    let repository = TreeRepository::new(store).with_root_name(config.defaults.root_name.clone());
    Session::open(repository, previews).with_new_folder_name(config.defaults.new_folder_name.clone())
}
