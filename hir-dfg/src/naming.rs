//! Sub-graph naming contract shared by [`crate::component`] and
//! [`crate::extract`].

/// Builds the name for the `index`-th output graph of a decomposition pass:
/// `<parent>-component-<index>`, or `<parent>-<label>-component-<index>` when
/// the caller supplied a non-empty disambiguating label.
pub(crate) fn component_name(parent: &str, label: &str, index: u32) -> String {
    if label.is_empty() {
        format!("{parent}-component-{index}")
    } else {
        format!("{parent}-{label}-component-{index}")
    }
}
