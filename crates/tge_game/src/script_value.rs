//! Values crossing the native/script boundary.
//!
//! Native bindings never look at raw Lua values: arguments are converted into
//! [`ScriptValue`]s once and then coerced to the native type each binding
//! needs, so every binding reports bad arguments the same way.

use mlua::prelude::*;
use tge_render::WHITE;

use crate::audio::SoundHandle;

impl LuaUserData for SoundHandle {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method("__tostring", |_, this, ()| Ok(format!("Sound({})", this.0)));
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Handle(SoundHandle),
    /// Any other Lua value, kept only for its type name.
    Unsupported(&'static str),
}

impl ScriptValue {
    pub fn from_lua(value: &LuaValue) -> Self {
        match value {
            LuaValue::Nil => ScriptValue::Nil,
            LuaValue::Boolean(b) => ScriptValue::Boolean(*b),
            LuaValue::Integer(i) => ScriptValue::Number(*i as f64),
            LuaValue::Number(n) => ScriptValue::Number(*n),
            LuaValue::String(s) => ScriptValue::String(s.to_string_lossy()),
            LuaValue::UserData(ud) => match ud.borrow::<SoundHandle>() {
                Ok(handle) => ScriptValue::Handle(*handle),
                Err(_) => ScriptValue::Unsupported("userdata"),
            },
            other => ScriptValue::Unsupported(other.type_name()),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Numbers, and strings that parse as numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            ScriptValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Strings, and numbers formatted the way Lua prints them.
    pub fn as_string(&self) -> Option<String> {
        match self {
            ScriptValue::String(s) => Some(s.clone()),
            ScriptValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            ScriptValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Lua truthiness: only nil and false are false.
    pub fn truthy(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Boolean(false))
    }

    pub fn as_handle(&self) -> Option<SoundHandle> {
        match self {
            ScriptValue::Handle(h) => Some(*h),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Handle(_) => "sound",
            ScriptValue::Unsupported(name) => name,
        }
    }
}

/// Packed colours arrive as numbers; wrap them into 32 bits.
pub fn color_from_number(n: f64) -> u32 {
    n as i64 as u32
}

/// Resource handle from a number. Negative or non-finite values select nothing.
pub fn index_from_number(n: f64) -> Option<usize> {
    (n.is_finite() && n >= 0.0).then_some(n as usize)
}

/// Arguments of one native call.
pub struct Args {
    name: &'static str,
    values: Vec<ScriptValue>,
}

impl Args {
    pub fn new(name: &'static str, values: LuaMultiValue) -> Self {
        Self {
            name,
            values: values.iter().map(ScriptValue::from_lua).collect(),
        }
    }

    #[cfg(test)]
    pub fn from_values(name: &'static str, values: Vec<ScriptValue>) -> Self {
        Self { name, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> &ScriptValue {
        self.values.get(index).unwrap_or(&ScriptValue::Nil)
    }

    fn bad_argument(&self, index: usize, expected: &str) -> LuaError {
        LuaError::RuntimeError(format!(
            "bad argument #{} to '{}' (expected {}, got {})",
            index + 1,
            self.name,
            expected,
            self.get(index).type_name()
        ))
    }

    pub fn number(&self, index: usize) -> LuaResult<f64> {
        self.get(index)
            .as_number()
            .ok_or_else(|| self.bad_argument(index, "number"))
    }

    pub fn float(&self, index: usize) -> LuaResult<f32> {
        self.number(index).map(|n| n as f32)
    }

    pub fn int(&self, index: usize) -> LuaResult<i64> {
        self.number(index).map(|n| n as i64)
    }

    pub fn string(&self, index: usize) -> LuaResult<String> {
        self.get(index)
            .as_string()
            .ok_or_else(|| self.bad_argument(index, "string"))
    }

    pub fn boolean(&self, index: usize) -> bool {
        self.get(index).truthy()
    }

    /// Optional trailing colour: white unless the caller supplied it.
    pub fn color(&self, index: usize) -> LuaResult<u32> {
        if index >= self.len() || self.get(index).is_nil() {
            return Ok(WHITE);
        }
        self.number(index).map(color_from_number)
    }

    /// Resource handle where nil selects the default.
    pub fn handle(&self, index: usize) -> LuaResult<Option<usize>> {
        if self.get(index).is_nil() {
            return Ok(None);
        }
        self.number(index).map(index_from_number)
    }

    pub fn sound(&self, index: usize) -> LuaResult<SoundHandle> {
        self.get(index)
            .as_handle()
            .ok_or_else(|| self.bad_argument(index, "sound"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: Vec<ScriptValue>) -> Args {
        Args::from_values("draw_sprite", values)
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let a = args(vec![
            ScriptValue::Number(2.5),
            ScriptValue::String(" 7 ".to_string()),
            ScriptValue::String("seven".to_string()),
        ]);
        assert_eq!(a.number(0).unwrap(), 2.5);
        assert_eq!(a.number(1).unwrap(), 7.0);
        let err = a.number(2).unwrap_err().to_string();
        assert!(err.contains("bad argument #3 to 'draw_sprite'"), "{err}");
    }

    #[test]
    fn missing_required_argument_is_an_error() {
        let a = args(vec![ScriptValue::Number(1.0)]);
        let err = a.float(1).unwrap_err().to_string();
        assert!(err.contains("#2"), "{err}");
        assert!(err.contains("expected number, got nil"), "{err}");
    }

    #[test]
    fn strings_accept_numbers() {
        let a = args(vec![ScriptValue::Number(3.0), ScriptValue::Number(0.5)]);
        assert_eq!(a.string(0).unwrap(), "3");
        assert_eq!(a.string(1).unwrap(), "0.5");
        assert!(args(vec![ScriptValue::Boolean(true)]).string(0).is_err());
    }

    #[test]
    fn booleans_follow_lua_truthiness() {
        let a = args(vec![
            ScriptValue::Number(0.0),
            ScriptValue::Boolean(false),
            ScriptValue::Nil,
            ScriptValue::String(String::new()),
        ]);
        assert!(a.boolean(0));
        assert!(!a.boolean(1));
        assert!(!a.boolean(2));
        assert!(a.boolean(3));
        assert!(!a.boolean(10));
    }

    #[test]
    fn colour_defaults_to_white_when_omitted() {
        let a = args(vec![ScriptValue::Number(1.0), ScriptValue::Number(2.0)]);
        assert_eq!(a.color(2).unwrap(), WHITE);
        let a = args(vec![ScriptValue::Number(4278190335.0)]);
        assert_eq!(a.color(0).unwrap(), 0xff00_00ff);
        let a = args(vec![ScriptValue::Number(-1.0)]);
        assert_eq!(a.color(0).unwrap(), 0xffff_ffff);
    }

    #[test]
    fn handles_treat_nil_and_negatives_as_default() {
        let a = args(vec![
            ScriptValue::Nil,
            ScriptValue::Number(-1.0),
            ScriptValue::Number(2.0),
        ]);
        assert_eq!(a.handle(0).unwrap(), None);
        assert_eq!(a.handle(1).unwrap(), None);
        assert_eq!(a.handle(2).unwrap(), Some(2));
    }

    #[test]
    fn sound_handles_round_trip_through_lua() {
        let lua = Lua::new();
        let ud = lua.create_userdata(SoundHandle(4)).unwrap();
        let value = ScriptValue::from_lua(&LuaValue::UserData(ud));
        assert_eq!(value.as_handle(), Some(SoundHandle(4)));

        let table = lua.create_table().unwrap();
        assert_eq!(
            ScriptValue::from_lua(&LuaValue::Table(table)),
            ScriptValue::Unsupported("table")
        );
    }
}
