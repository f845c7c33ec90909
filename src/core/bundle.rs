//! Resources compiled into the binary: the local catalog, its scripts and the
//! default repository list.

use std::borrow::Cow;

use rust_embed::Embed;

#[derive(Embed)]
#[folder = "bundle/"]
struct BundleAssets;

/// Raw bytes of a bundled resource, or `None` when absent.
pub fn read(path: &str) -> Option<Cow<'static, [u8]>> {
    let path = path.trim_start_matches("./").trim_start_matches('/');
    <BundleAssets as Embed>::get(path).map(|file| file.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_ships_catalog_and_repo_list() {
        assert!(read("actions.yaml").is_some());
        assert!(read("repo.yaml").is_some());
        assert!(read("/actions.yaml").is_some());
        assert!(read("missing.sh").is_none());
        assert!(read("scripts/backup_config.sh").is_some());
    }
}
