use crate::bundle;
use crate::catalog::{Catalog, CATALOG_FILE};
use crate::error::{Error, Result};
use crate::github::SCRIPT_ROOT;

use super::{ActionProvider, LOCAL_SOURCE};

/// Actions and scripts compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

fn bundle_path(path: &str) -> &str {
    let path = path.trim_start_matches("./").trim_start_matches('/');
    path.strip_prefix(SCRIPT_ROOT).unwrap_or(path)
}

impl ActionProvider for LocalSource {
    fn source_name(&self) -> String {
        LOCAL_SOURCE.to_string()
    }

    fn load_catalog(&self) -> Result<Catalog> {
        let data = bundle::read(CATALOG_FILE)
            .ok_or_else(|| Error::resource_not_found(LOCAL_SOURCE, CATALOG_FILE))?;
        Catalog::from_bytes(&data, LOCAL_SOURCE)
    }

    fn load_step(&self, script_ref: &str) -> Result<String> {
        let path = bundle_path(script_ref);
        let data = bundle::read(path)
            .ok_or_else(|| Error::resource_not_found(LOCAL_SOURCE, script_ref))?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}
