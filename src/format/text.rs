//! Text formatting functions for `permsync`.
//!
//! Plain (non-ANSI) output. Padding is measured in terminal columns with
//! `unicode-width`, so display names with wide characters still line up.

use std::collections::BTreeSet;

use permsync_lib::{MigrationState, Role, Scheme};
use unicode_width::UnicodeWidthStr;

/// State icons for migration rows.
pub mod icons {
    pub const COMPLETED: &str = "✓";
    pub const PENDING: &str = "○";
}

#[must_use]
pub const fn format_state_icon(state: MigrationState) -> &'static str {
    match state {
        MigrationState::Completed => icons::COMPLETED,
        MigrationState::Pending => icons::PENDING,
    }
}

/// Pad `text` with spaces to `width` display columns.
///
/// Text already wider than `width` is returned unchanged.
#[must_use]
pub fn pad_display(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    let mut out = String::with_capacity(text.len() + width.saturating_sub(used));
    out.push_str(text);
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    out
}

/// Format a single-line scheme summary.
///
/// Format: `{name} [{scope}] {display_name}` with the name padded to `name_width`.
#[must_use]
pub fn format_scheme_line(scheme: &Scheme, name_width: usize) -> String {
    format!(
        "{} {} {}",
        pad_display(&scheme.name, name_width),
        pad_display(&format!("[{}]", scheme.scope), 9),
        scheme.display_name
    )
}

/// Format a single-line role summary.
#[must_use]
pub fn format_role_line(role: &Role, name_width: usize) -> String {
    let marker = if role.built_in {
        " (built-in)"
    } else if role.scheme_managed {
        " (scheme)"
    } else {
        ""
    };
    format!(
        "{} {:>3} permission(s){marker}",
        pad_display(&role.name, name_width),
        role.permissions.len()
    )
}

/// Lay out permissions in rows no wider than `max_width` columns.
#[must_use]
pub fn wrap_permissions(permissions: &BTreeSet<String>, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for permission in permissions {
        let extra = usize::from(!current.is_empty());
        if !current.is_empty()
            && UnicodeWidthStr::width(current.as_str()) + extra + permission.width() > max_width
        {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(permission);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use permsync_lib::SchemeScope;

    #[test]
    fn pad_counts_wide_characters() {
        assert_eq!(pad_display("ab", 4), "ab  ");
        assert_eq!(pad_display("日本", 6), "日本  ");
        assert_eq!(pad_display("toolong", 3), "toolong");
    }

    #[test]
    fn scheme_line_layout() {
        let scheme = Scheme {
            name: "house".into(),
            display_name: "House Rules".into(),
            scope: SchemeScope::Team,
            ..Scheme::default()
        };
        assert_eq!(format_scheme_line(&scheme, 6), "house  [team]    House Rules");
    }

    #[test]
    fn role_line_marks_builtin() {
        let mut role = Role {
            name: "system_admin".into(),
            built_in: true,
            ..Role::default()
        };
        role.grant(["a"]);
        assert_eq!(
            format_role_line(&role, 12),
            "system_admin   1 permission(s) (built-in)"
        );
    }

    #[test]
    fn wrap_respects_width() {
        let permissions: BTreeSet<String> =
            ["aaaa", "bbbb", "cccc"].iter().map(ToString::to_string).collect();
        assert_eq!(wrap_permissions(&permissions, 9), vec!["aaaa bbbb", "cccc"]);
        assert!(wrap_permissions(&BTreeSet::new(), 9).is_empty());
    }

    #[test]
    fn state_icons() {
        assert_eq!(format_state_icon(MigrationState::Completed), "✓");
        assert_eq!(format_state_icon(MigrationState::Pending), "○");
    }

    proptest::proptest! {
        #[test]
        fn pad_reaches_requested_width(text in "[a-z日本]{0,8}", width in 0usize..24) {
            let padded = pad_display(&text, width);
            let used = UnicodeWidthStr::width(text.as_str());
            proptest::prop_assert_eq!(UnicodeWidthStr::width(padded.as_str()), used.max(width));
            proptest::prop_assert!(padded.starts_with(&text));
        }
    }
}
