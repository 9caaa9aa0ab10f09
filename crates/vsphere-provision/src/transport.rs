use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use vsphere_api::DatastorePath;

use crate::session::Datastore;
use crate::{Error, Result};

/// Datastore location of a machine's userdata ISO, relative to the root.
///
/// Deletion on teardown relies on this staying stable.
pub fn datastore_iso_filename(name: &str) -> String {
    format!("{name}/cloud-init.iso")
}

/// Moves userdata ISOs to and from the datastore.
#[derive(Clone)]
pub struct UserdataTransport {
    datastore: Arc<dyn Datastore>,
}

impl UserdataTransport {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    /// Upload `image` for machine `name` and return the path to use as the
    /// cdrom backing.
    pub async fn upload(&self, image: &Path, name: &str) -> Result<DatastorePath> {
        let remote = datastore_iso_filename(name);
        info!(vm = name, path = %remote, "uploading userdata iso to datastore");

        self.datastore
            .upload_file(image, &remote)
            .await
            .map_err(|source| Error::UploadFailure {
                path: remote.clone(),
                source,
            })?;

        let path = self.datastore.path(&remote);
        info!(vm = name, path = %path, "uploaded userdata iso");
        Ok(path)
    }

    /// Delete the ISO of machine `name`. An ISO that is already gone counts
    /// as deleted.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let remote = datastore_iso_filename(name);
        match self.datastore.delete_file(&remote).await {
            Ok(()) => {
                info!(vm = name, path = %remote, "deleted userdata iso");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!(vm = name, path = %remote, "userdata iso already deleted");
                Ok(())
            }
            Err(source) => Err(Error::DeleteFailure {
                vm: name.to_string(),
                source,
            }),
        }
    }
}
