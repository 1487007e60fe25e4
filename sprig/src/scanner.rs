//! Discovery of candidate bean types under a root module path.

use crate::descriptor::TypeCatalog;
use crate::error::ConfigurationError;
use itertools::Itertools;
use tracing::debug;

/// Name of the property holding the root module path.
pub const SCAN_PACKAGE: &str = "scanPackage";

/// Converts dotted package notation (`app.demo`) to a module path (`app::demo`).
pub fn module_path_of(package: &str) -> String {
    package
        .trim()
        .split("::")
        .flat_map(|part| part.split('.'))
        .filter(|part| !part.is_empty())
        .join("::")
}

/// Returns the fully-qualified names of all types living in the given module or any of its
/// sub-modules, sorted by name.
pub fn scan(
    catalog: &TypeCatalog,
    root_package: &str,
) -> Result<Vec<&'static str>, ConfigurationError> {
    let root = module_path_of(root_package);
    if root.is_empty() {
        return Err(ConfigurationError::MissingProperty(SCAN_PACKAGE.to_string()));
    }

    let nested_prefix = format!("{root}::");
    let names = catalog
        .type_names()
        .filter(|name| {
            catalog.descriptor(name).map_or(false, |descriptor| {
                let module = descriptor.module_path();
                module == root || module.starts_with(&nested_prefix)
            })
        })
        .sorted()
        .collect_vec();

    if names.is_empty() {
        return Err(ConfigurationError::UnresolvedScanPackage(root));
    }

    debug!("Found {} types under {root}.", names.len());
    Ok(names)
}
