//! Accelerator syntax checks.
//!
//! An accelerator is `Modifier+Modifier+Key`. Only the modifier list is
//! validated; any non-empty key name is accepted.

/// Modifier names accepted before the key segment (case-sensitive).
pub const MODIFIERS: &[&str] = &[
    "Command",
    "Cmd",
    "Control",
    "Ctrl",
    "CommandOrControl",
    "CmdOrCtrl",
    "Alt",
    "Option",
    "AltGr",
    "Shift",
    "Super",
    "Meta",
];

/// A syntactically valid accelerator split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accelerator<'a> {
    pub modifiers: Vec<&'a str>,
    pub key: &'a str,
}

impl<'a> Accelerator<'a> {
    pub fn parse(accelerator: &'a str) -> Option<Self> {
        let mut parts: Vec<&str> = accelerator.split('+').collect();
        let key = parts.pop().filter(|k| !k.is_empty())?;
        if !parts.iter().all(|m| is_modifier(m)) {
            return None;
        }
        Some(Self {
            modifiers: parts,
            key,
        })
    }
}

pub fn is_modifier(segment: &str) -> bool {
    MODIFIERS.contains(&segment)
}

pub fn is_accelerator_valid(accelerator: &str) -> bool {
    Accelerator::parse(accelerator).is_some()
}
