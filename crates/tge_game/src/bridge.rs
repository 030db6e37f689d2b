//! Native function bridge.
//!
//! Registers the engine's native surface as Lua globals: the `Game`, `Mouse`
//! and `Keys` tables plus one function per native operation. Every binding
//! converts its arguments through [`Args`] and borrows the shared
//! [`EngineContext`] only for the duration of the call.

use std::path::{Path, PathBuf};

use glam::Vec2;
use mlua::prelude::*;
use tge_core::keys::{KEYS, MOUSE_BUTTONS};
use tge_render::{SpriteQuad, UniformValue};

use crate::context::{EngineContext, SharedContext};
use crate::script_value::Args;

/// Define a global function with access to the engine context.
fn bind<R, F>(lua: &Lua, ctx: &SharedContext, name: &'static str, f: F) -> LuaResult<()>
where
    R: IntoLuaMulti,
    F: Fn(&Lua, &mut EngineContext, &Args) -> LuaResult<R> + 'static,
{
    let ctx = ctx.clone();
    let func = lua.create_function(move |lua, values: LuaMultiValue| {
        let args = Args::new(name, values);
        let mut ctx = ctx.try_borrow_mut().map_err(|_| {
            LuaError::RuntimeError(format!("'{name}' called while the engine is busy"))
        })?;
        f(lua, &mut ctx, &args)
    })?;
    lua.globals().set(name, func)
}

pub fn register(lua: &Lua, ctx: &SharedContext, script_dir: &Path) -> LuaResult<()> {
    register_tables(lua, ctx)?;
    register_lifecycle(lua, ctx, script_dir)?;
    register_input(lua, ctx)?;
    register_resources(lua, ctx)?;
    register_uniforms(lua, ctx)?;
    register_drawing(lua, ctx)?;
    register_audio(lua, ctx)?;
    Ok(())
}

fn register_tables(lua: &Lua, ctx: &SharedContext) -> LuaResult<()> {
    let size = ctx.borrow().graphics.display_size();
    let game = lua.create_table()?;
    game.set("display_width", size.x)?;
    game.set("display_height", size.y)?;
    game.set("time", 0.0)?;
    game.set("delta_time", 0.0)?;
    game.set("frame", 0)?;
    game.set("fps", 0.0)?;
    lua.globals().set("Game", game)?;

    let mouse = lua.create_table()?;
    for (name, button) in MOUSE_BUTTONS {
        mouse.set(*name, *button)?;
    }
    mouse.set("x", 0.0)?;
    mouse.set("y", 0.0)?;
    lua.globals().set("Mouse", mouse)?;

    let keys = lua.create_table()?;
    for (name, code) in KEYS {
        keys.set(*name, *code)?;
    }
    lua.globals().set("Keys", keys)?;
    Ok(())
}

fn register_lifecycle(lua: &Lua, ctx: &SharedContext, script_dir: &Path) -> LuaResult<()> {
    bind(lua, ctx, "exit", |_, ctx, _| {
        ctx.request_exit();
        Ok(())
    })?;
    bind(lua, ctx, "random", |_, _, _| Ok(rand::random::<f64>()))?;
    bind(lua, ctx, "set_fullscreen", |_, ctx, args| {
        ctx.request_fullscreen(args.boolean(0));
        Ok(())
    })?;

    // Runs scripts, which call back into bindings, so it must not hold the context.
    let dir: PathBuf = script_dir.to_path_buf();
    let dofile = lua.create_function(move |lua, values: LuaMultiValue| {
        let args = Args::new("dofile", values);
        for i in 0..args.len() {
            let path = dir.join(args.string(i)?);
            match std::fs::read_to_string(&path) {
                Ok(source) => lua
                    .load(&source)
                    .set_name(path.to_string_lossy())
                    .exec()?,
                Err(e) => log::warn!("dofile: failed to read {}: {e}", path.display()),
            }
        }
        Ok(())
    })?;
    lua.globals().set("dofile", dofile)?;

    let print = lua.create_function(|lua, values: LuaMultiValue| {
        let tostring: LuaFunction = lua.globals().get("tostring")?;
        let mut parts = Vec::with_capacity(values.len());
        for value in values {
            parts.push(tostring.call::<String>(value)?);
        }
        log::info!(target: "script", "{}", parts.join("\t"));
        Ok(())
    })?;
    lua.globals().set("print", print)?;
    Ok(())
}

fn key_arg(args: &Args, index: usize) -> LuaResult<Option<u32>> {
    let code = args.int(index)?;
    Ok(u32::try_from(code).ok())
}

fn register_input(lua: &Lua, ctx: &SharedContext) -> LuaResult<()> {
    bind(lua, ctx, "key_down", |_, ctx, args| {
        Ok(key_arg(args, 0)?.is_some_and(|k| ctx.input.key_down(k)))
    })?;
    bind(lua, ctx, "key_pressed", |_, ctx, args| {
        Ok(key_arg(args, 0)?.is_some_and(|k| ctx.input.key_pressed(k)))
    })?;
    bind(lua, ctx, "key_released", |_, ctx, args| {
        Ok(key_arg(args, 0)?.is_some_and(|k| ctx.input.key_released(k)))
    })?;
    bind(lua, ctx, "mouse_down", |_, ctx, args| {
        Ok(key_arg(args, 0)?.is_some_and(|b| ctx.input.mouse_down(b)))
    })?;
    bind(lua, ctx, "mouse_pressed", |_, ctx, args| {
        Ok(key_arg(args, 0)?.is_some_and(|b| ctx.input.mouse_pressed(b)))
    })?;
    bind(lua, ctx, "mouse_released", |_, ctx, args| {
        Ok(key_arg(args, 0)?.is_some_and(|b| ctx.input.mouse_released(b)))
    })?;
    Ok(())
}

fn register_resources(lua: &Lua, ctx: &SharedContext) -> LuaResult<()> {
    bind(lua, ctx, "load_sprite", |_, ctx, args| {
        Ok(ctx.graphics.load_sprite(&args.string(0)?))
    })?;
    bind(lua, ctx, "load_font", |_, ctx, args| {
        Ok(ctx.graphics.load_font(&args.string(0)?))
    })?;
    bind(lua, ctx, "load_shader", |_, ctx, args| {
        Ok(ctx.graphics.load_shader(&args.string(0)?))
    })?;
    bind(lua, ctx, "set_sprite", |_, ctx, args| {
        ctx.graphics.set_sprite(args.handle(0)?);
        Ok(())
    })?;
    bind(lua, ctx, "set_font", |_, ctx, args| {
        ctx.graphics.set_font(args.handle(0)?);
        Ok(())
    })?;
    bind(lua, ctx, "set_shader", |_, ctx, args| {
        ctx.graphics.set_shader(args.handle(0)?);
        Ok(())
    })?;
    Ok(())
}

fn register_uniforms(lua: &Lua, ctx: &SharedContext) -> LuaResult<()> {
    bind(lua, ctx, "set_shader_texture", |_, ctx, args| {
        let slot = u32::try_from(args.int(0)?).unwrap_or(u32::MAX);
        ctx.graphics.set_shader_texture(slot, args.handle(1)?);
        Ok(())
    })?;
    bind(lua, ctx, "set_shader_float", |_, ctx, args| {
        let value = UniformValue::Float(args.float(1)?);
        ctx.graphics.set_uniform(&args.string(0)?, value);
        Ok(())
    })?;
    bind(lua, ctx, "set_shader_vec2", |_, ctx, args| {
        let value = UniformValue::Vec2([args.float(1)?, args.float(2)?]);
        ctx.graphics.set_uniform(&args.string(0)?, value);
        Ok(())
    })?;
    bind(lua, ctx, "set_shader_vec3", |_, ctx, args| {
        let value = UniformValue::Vec3([args.float(1)?, args.float(2)?, args.float(3)?]);
        ctx.graphics.set_uniform(&args.string(0)?, value);
        Ok(())
    })?;
    bind(lua, ctx, "set_shader_vec4", |_, ctx, args| {
        let value = UniformValue::Vec4([
            args.float(1)?,
            args.float(2)?,
            args.float(3)?,
            args.float(4)?,
        ]);
        ctx.graphics.set_uniform(&args.string(0)?, value);
        Ok(())
    })?;
    bind(lua, ctx, "set_shader_int", |_, ctx, args| {
        let value = UniformValue::Int(args.int(1)? as i32);
        ctx.graphics.set_uniform(&args.string(0)?, value);
        Ok(())
    })?;
    Ok(())
}

fn vec2(args: &Args, index: usize) -> LuaResult<Vec2> {
    Ok(Vec2::new(args.float(index)?, args.float(index + 1)?))
}

fn register_drawing(lua: &Lua, ctx: &SharedContext) -> LuaResult<()> {
    bind(lua, ctx, "draw_sprite", |_, ctx, args| {
        let pos = vec2(args, 0)?;
        let color = args.color(2)?;
        ctx.graphics
            .draw_sprite(pos, Vec2::ZERO, 0.0, Vec2::ONE, color);
        Ok(())
    })?;
    bind(lua, ctx, "draw_sprite_ext", |_, ctx, args| {
        let pos = vec2(args, 0)?;
        let origin = vec2(args, 2)?;
        let angle = args.float(4)?;
        let scale = vec2(args, 5)?;
        let color = args.color(7)?;
        ctx.graphics.draw_sprite(pos, origin, angle, scale, color);
        Ok(())
    })?;
    bind(lua, ctx, "draw_sprite_part", |_, ctx, args| {
        let quad = SpriteQuad::at(vec2(args, 0)?, vec2(args, 2)?, vec2(args, 4)?, args.color(6)?);
        ctx.graphics.draw_sprite_part(quad);
        Ok(())
    })?;
    bind(lua, ctx, "draw_sprite_sheet", |_, ctx, args| {
        let name = args.string(0)?;
        let pos = vec2(args, 1)?;
        let origin = vec2(args, 3)?;
        let angle = args.float(5)?;
        let scale = vec2(args, 6)?;
        let color = args.color(8)?;
        ctx.graphics
            .draw_sprite_sheet(&name, pos, origin, angle, scale, color);
        Ok(())
    })?;
    bind(lua, ctx, "draw_text", |_, ctx, args| {
        let text = args.string(0)?;
        let pos = vec2(args, 1)?;
        let color = args.color(3)?;
        ctx.graphics.draw_text(&text, pos, color);
        Ok(())
    })?;
    bind(lua, ctx, "measure_text", |_, ctx, args| {
        let size = ctx.graphics.measure_text(&args.string(0)?);
        Ok((size.x, size.y))
    })?;
    Ok(())
}

fn register_audio(lua: &Lua, ctx: &SharedContext) -> LuaResult<()> {
    bind(lua, ctx, "play_sound", |_, ctx, args| {
        ctx.play_sound(&args.string(0)?);
        Ok(())
    })?;
    bind(lua, ctx, "load_sound", |lua, ctx, args| {
        match ctx.load_sound(&args.string(0)?) {
            Some(handle) => Ok(LuaValue::UserData(lua.create_userdata(handle)?)),
            None => Ok(LuaValue::Nil),
        }
    })?;
    bind(lua, ctx, "start_sound", |_, ctx, args| {
        ctx.start_sound(args.sound(0)?, args.boolean(1));
        Ok(())
    })?;
    bind(lua, ctx, "stop_sound", |_, ctx, args| {
        ctx.stop_sound(args.sound(0)?);
        Ok(())
    })?;
    Ok(())
}
