use std::io;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Binds global key combinations to shell commands.
pub trait HotkeyRegistrar {
    fn register(&mut self, combo: &str, command: &str) -> Result<(), HotkeyError>;
    fn unregister_all(&mut self);
}

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("invalid key combination {0:?}")]
    InvalidCombo(String),
    #[error("failed to run hyprctl: {0}")]
    Spawn(#[from] io::Error),
    #[error("hyprctl rejected {binding:?}: {output}")]
    Rejected { binding: String, output: String },
}

/// Key combination in Hyprland's `MODS,KEY` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub mods: String,
    pub key: String,
}

impl KeyBinding {
    /// Parse `F9`, `super+F9` or `SUPER+SHIFT+P`.
    pub fn parse(combo: &str) -> Result<Self, HotkeyError> {
        let parts: Vec<&str> = combo.split('+').map(str::trim).collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(HotkeyError::InvalidCombo(combo.to_string()));
        }

        let (key, mods) = parts
            .split_last()
            .ok_or_else(|| HotkeyError::InvalidCombo(combo.to_string()))?;
        let mods: Vec<String> = mods.iter().map(|m| m.to_uppercase()).collect();

        Ok(Self {
            mods: mods.join(" "),
            key: key.to_uppercase(),
        })
    }

    fn bind_arg(&self, command: &str) -> String {
        format!("{},{},exec,{}", self.mods, self.key, command)
    }

    fn unbind_arg(&self) -> String {
        format!("{},{}", self.mods, self.key)
    }
}

/// Registers bindings at runtime through `hyprctl keyword`.
///
/// Bindings are removed again on [`HotkeyRegistrar::unregister_all`] or drop.
#[derive(Debug, Default)]
pub struct HyprlandHotkeys {
    bound: Vec<KeyBinding>,
}

impl HyprlandHotkeys {
    pub fn new() -> Self {
        Self::default()
    }

    fn hyprctl_keyword(args: &[&str]) -> Result<String, HotkeyError> {
        let output = Command::new("hyprctl").arg("keyword").args(args).output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || stdout != "ok" {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HotkeyError::Rejected {
                binding: args.join(" "),
                output: if stdout.is_empty() { stderr } else { stdout },
            });
        }
        Ok(stdout)
    }
}

impl HotkeyRegistrar for HyprlandHotkeys {
    fn register(&mut self, combo: &str, command: &str) -> Result<(), HotkeyError> {
        let binding = KeyBinding::parse(combo)?;
        Self::hyprctl_keyword(&["bind", &binding.bind_arg(command)])?;
        info!("Registered hotkey {} -> {}", combo, command);
        self.bound.push(binding);
        Ok(())
    }

    fn unregister_all(&mut self) {
        for binding in self.bound.drain(..) {
            match Self::hyprctl_keyword(&["unbind", &binding.unbind_arg()]) {
                Ok(_) => debug!("Unbound {:?}", binding),
                Err(e) => warn!("Failed to unbind {:?}: {}", binding, e),
            }
        }
    }
}

impl Drop for HyprlandHotkeys {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
