//! Built-in vendor command tables.
//!
//! The probe battery sent to every new session, the prompt characters that
//! terminate a shell response, and the pagination-disable commands selected
//! by brand name.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::device::SignatureCatalog;

/// Characters that end a switch prompt (`sw#`, `sw>`, `<sw>`, `[sw]`).
pub const PROMPT_CHARS: &[&str] = &["#", ">", "]"];

/// Probe commands covering Comware/VRP, IOS, inventory-capable and
/// ArubaOS/ProCurve shells.
pub const BRAND_PROBE_COMMANDS: &[&str] =
    &["dis version", "show version", "show inventory", "show system"];

/// Sent after each probe so a pager prompt eats blanks instead of the
/// first character of the next probe.
pub const PROBE_PADDING: &str = "     ";

pub const HUAWEI_NO_PAGE: &str = "screen-length 0 temporary";
pub const H3C_NO_PAGE: &str = "screen-length disable";
pub const CISCO_NO_PAGE: &str = "terminal length 0";
pub const CISCO_SB_NO_PAGE: &str = "terminal datadump";
pub const ARUBA_CX_NO_PAGE: &str = "no page";

static PAGER_COMMANDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("huawei", HUAWEI_NO_PAGE),
        ("h3c", H3C_NO_PAGE),
        ("cisco", CISCO_NO_PAGE),
        ("Cisco IOS", CISCO_NO_PAGE),
        ("ArubaOS-CX", ARUBA_CX_NO_PAGE),
        // Cisco small business lines (SG350, SG500, CBS350).
        ("Version: 2.5", CISCO_SB_NO_PAGE),
        ("SW version", CISCO_SB_NO_PAGE),
        ("Version: 3.3", CISCO_SB_NO_PAGE),
    ])
});

/// Probe lines in send order, each followed by padding.
pub fn brand_probe_lines() -> Vec<&'static str> {
    BRAND_PROBE_COMMANDS
        .iter()
        .flat_map(|cmd| [*cmd, PROBE_PADDING])
        .collect()
}

/// Pagination-disable command for `brand`.
///
/// The fixed table is consulted first, then the catalog entry's `pager`.
/// Unknown brands get no command.
pub fn pager_command(brand: &str, catalog: &SignatureCatalog) -> Option<String> {
    if brand.is_empty() {
        return None;
    }
    if let Some(cmd) = PAGER_COMMANDS.get(brand) {
        return Some((*cmd).to_string());
    }
    catalog
        .by_name(brand)
        .filter(|sig| !sig.pager.trim().is_empty())
        .map(|sig| sig.pager.clone())
}

/// Whether a caller-supplied brand hint can replace detection.
pub fn is_known_brand(brand: &str, catalog: &SignatureCatalog) -> bool {
    !brand.is_empty() && (PAGER_COMMANDS.contains_key(brand) || catalog.by_name(brand).is_some())
}
