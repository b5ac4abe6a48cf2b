// crates/planguard-plugin/src/discover.rs
// ============================================================================
// Module: Provider Discovery
// Description: Locate the azurerm provider binary for a working directory.
// Purpose: Reuse the plan's own provider mirror before asking the user.
// Dependencies: std
// ============================================================================

//! ## Overview
//! An initialised working directory caches provider binaries under
//! `.terraform/providers/<registry>/<namespace>/<name>/<version>/<platform>/`.
//! Discovery honors the `PLANGUARD_PROVIDER_PATH` override first, then walks
//! the mirror for a `terraform-provider-azurerm*` executable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Environment override naming the provider binary.
pub const PROVIDER_PATH_ENV: &str = "PLANGUARD_PROVIDER_PATH";

/// Mirror subdirectory for the azurerm provider.
const AZURERM_MIRROR: &str = ".terraform/providers/registry.terraform.io/hashicorp/azurerm";

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Finds the azurerm provider binary for the given working directory.
///
/// Returns `None` when neither the environment override nor the local
/// provider mirror yields a binary.
#[must_use]
pub fn find_provider_binary(working_dir: &Path) -> Option<PathBuf> {
    if let Ok(path) = env::var(PROVIDER_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let mirror = working_dir.join(AZURERM_MIRROR);
    let mut versions: Vec<PathBuf> = fs::read_dir(&mirror)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    // Highest version directory wins.
    versions.sort();
    for version_dir in versions.into_iter().rev() {
        let platforms = fs::read_dir(&version_dir).ok();
        let Some(platforms) = platforms else {
            continue;
        };
        for platform in platforms.filter_map(|entry| entry.ok().map(|e| e.path())) {
            if let Some(binary) = provider_binary_in(&platform) {
                return Some(binary);
            }
        }
    }
    None
}

/// Looks for a provider executable in one platform directory.
fn provider_binary_in(platform_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(platform_dir).ok()?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("terraform-provider-azurerm") && path.is_file() {
            return Some(path);
        }
    }
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================
