//! Save format KDL parsing.

use anyhow::{anyhow, Result};
use tracing::trace;

use certsync_common::FileMode;

use crate::{SaveFormat, SlotConfig, SlotKind};

use super::helpers::{get_first_arg_string, get_int_property};

/// Parse a `save-format "name" { ... }` block
pub fn parse_save_format(node: &kdl::KdlNode) -> Result<SaveFormat> {
    let name = get_first_arg_string(node).ok_or_else(|| {
        anyhow!("Save format requires a name argument, e.g., save-format \"nginx\" {{ ... }}")
    })?;

    trace!(save_format = %name, "Parsing save format");

    let mut format = SaveFormat::new(&name);

    let Some(children) = node.children() else {
        return Ok(format);
    };

    for child in children.nodes() {
        let child_name = child.name().value();

        if child_name == "folder" {
            let folder = get_first_arg_string(child).ok_or_else(|| {
                anyhow!("Save format '{}' has a 'folder' without a path", name)
            })?;
            format.folder = Some(folder.into());
            continue;
        }

        let kind = SlotKind::from_node_name(child_name).ok_or_else(|| {
            anyhow!(
                "Unknown slot '{}' in save format '{}'. Valid slots: folder, {}",
                child_name,
                name,
                SlotKind::ALL
                    .iter()
                    .map(|k| k.node_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?;

        if format.slots.contains_key(&kind) {
            return Err(anyhow!(
                "Slot '{}' is declared twice in save format '{}'",
                kind,
                name
            ));
        }

        let path = get_first_arg_string(child).ok_or_else(|| {
            anyhow!(
                "Slot '{}' in save format '{}' requires a file name, e.g., {} \"file.pem\"",
                kind,
                name,
                kind
            )
        })?;

        let mut slot = SlotConfig::new(path);
        if let Some(mode) = get_int_property(child, "mode") {
            let bits = u32::try_from(mode)
                .ok()
                .filter(|bits| *bits <= 0o7777)
                .ok_or_else(|| {
                    anyhow!(
                        "Invalid mode {} for slot '{}' in save format '{}'",
                        mode,
                        kind,
                        name
                    )
                })?;
            slot = slot.with_mode(FileMode::new(bits));
        }

        trace!(save_format = %name, slot = %kind, path = %slot.path.display(), "Parsed slot");
        format.slots.insert(kind, slot);
    }

    Ok(format)
}
