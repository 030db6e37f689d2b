//! Script host: one Lua state with the native surface bound and the entry
//! script executed. A host either constructs fully or not at all; a host
//! whose hook fails is dropped by the caller, never repaired.

use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::bridge;
use crate::context::SharedContext;

#[derive(Debug)]
pub enum ScriptError {
    Io { path: PathBuf, message: String },
    Lua(LuaError),
    /// The engine context was already borrowed when a hook needed it.
    Busy,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Io { path, message } => {
                write!(f, "Failed to read script {}: {message}", path.display())
            }
            ScriptError::Lua(err) => write!(f, "{err}"),
            ScriptError::Busy => f.write_str("engine context is busy"),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<LuaError> for ScriptError {
    fn from(err: LuaError) -> Self {
        ScriptError::Lua(err)
    }
}

pub struct ScriptHost {
    lua: Lua,
    entry_path: PathBuf,
}

impl ScriptHost {
    /// Create the interpreter, bind the native surface and run the entry script.
    pub fn new(ctx: &SharedContext, script_dir: &Path, entry: &str) -> Result<Self, ScriptError> {
        let entry_path = script_dir.join(entry);
        log::info!("Starting script host: {}", entry_path.display());

        let lua = Lua::new();
        bridge::register(&lua, ctx, script_dir)?;

        let source = std::fs::read_to_string(&entry_path).map_err(|e| ScriptError::Io {
            path: entry_path.clone(),
            message: e.to_string(),
        })?;
        lua.load(&source)
            .set_name(entry_path.to_string_lossy())
            .exec()?;

        Ok(Self { lua, entry_path })
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    /// Call a global hook with no arguments. Undefined hooks are skipped.
    pub fn call_hook(&self, name: &str) -> Result<(), ScriptError> {
        match self.lua.globals().get::<LuaValue>(name)? {
            LuaValue::Function(hook) => hook.call::<()>(()).map_err(ScriptError::from),
            LuaValue::Nil => Ok(()),
            other => Err(ScriptError::Lua(LuaError::RuntimeError(format!(
                "hook '{name}' is a {}, not a function",
                other.type_name()
            )))),
        }
    }

    /// Refresh the `Game` and `Mouse` tables before hooks run.
    pub fn publish(&self, ctx: &SharedContext) -> Result<(), ScriptError> {
        let (size, mouse, time, delta, frame, fps) = {
            let ctx = ctx.try_borrow().map_err(|_| ScriptError::Busy)?;
            (
                ctx.graphics.display_size(),
                ctx.input.mouse_position(),
                ctx.clock.total_time,
                ctx.clock.delta,
                ctx.clock.frame_count,
                ctx.clock.smoothed_fps,
            )
        };
        let globals = self.lua.globals();
        let game: LuaTable = globals.get("Game")?;
        game.set("display_width", size.x)?;
        game.set("display_height", size.y)?;
        game.set("time", time)?;
        game.set("delta_time", delta)?;
        game.set("frame", frame)?;
        game.set("fps", fps)?;
        let mouse_table: LuaTable = globals.get("Mouse")?;
        mouse_table.set("x", mouse.x)?;
        mouse_table.set("y", mouse.y)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn global<T: FromLua>(&self, name: &str) -> Result<T, ScriptError> {
        Ok(self.lua.globals().get::<T>(name)?)
    }
}
