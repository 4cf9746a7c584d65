use std::{
    collections::HashMap,
    fmt::{self, Display, Write},
};

use crate::compile::ast::Type;

pub fn type_name(ty: Type) -> &'static str {
    match ty {
        Type::Integer => "i32",
        Type::Real => "double",
        Type::Text => "ptr",
        Type::Boolean => "i1",
        Type::Void => "void",
    }
}

/// Value a freshly declared variable of type `ty` holds.
pub fn zero(ty: Type) -> &'static str {
    match ty {
        Type::Integer => "0",
        Type::Real => "0.0",
        Type::Text => "null",
        Type::Boolean => "false",
        Type::Void => "undef",
    }
}

/// Doubles are written as their IEEE bit pattern, which is exact for every value.
pub fn real_literal(value: f64) -> String {
    format!("0x{:016X}", value.to_bits())
}

/// A computed value: a register or a constant, together with its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub repr: String,
    pub ty: Type,
}

impl Value {
    pub fn new(repr: impl Into<String>, ty: Type) -> Self {
        Value {
            repr: repr.into(),
            ty,
        }
    }
}

/// Typed operand form, e.g. `i32 %3`.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", type_name(self.ty), self.repr)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    /// Array length including the terminating NUL.
    pub len: usize,
}

impl Global {
    pub fn array_type(&self) -> String {
        format!("[{} x i8]", self.len)
    }
}

/// String constants of one module, one global per distinct content.
#[derive(Clone, Debug, Default)]
pub struct StringPool {
    contents: Vec<String>,
    index: HashMap<String, usize>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, content: &str) -> Global {
        let id = match self.index.get(content) {
            Some(id) => *id,
            None => {
                let id = self.contents.len();
                self.contents.push(content.to_string());
                self.index.insert(content.to_string(), id);
                id
            }
        };

        Global {
            name: format!("@.str{id}"),
            len: content.len() + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn write_globals(&self, out: &mut impl Write) -> fmt::Result {
        for (id, content) in self.contents.iter().enumerate() {
            writeln!(
                out,
                "@.str{id} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                content.len() + 1,
                escape(content)
            )?;
        }

        Ok(())
    }
}

/// Escapes `content` for a `c"..."` constant. Quotes, backslashes and any
/// byte outside printable ASCII become `\XX`.
pub fn escape(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());

    for byte in content.bytes() {
        match byte {
            b'"' | b'\\' => escaped.push_str(&format!("\\{byte:02X}")),
            0x20..=0x7E => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{byte:02X}")),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_escape {
        ($name:ident, $input:expr, $expected:expr) => {
            #[test]
            fn $name() {
                assert_eq!(escape($input), $expected);
            }
        };
    }

    test_escape!(plain_text, "ola mundo", "ola mundo");
    test_escape!(newline, "a\nb", "a\\0Ab");
    test_escape!(quote, "diz \"oi\"", "diz \\22oi\\22");
    test_escape!(backslash, "c:\\dir", "c:\\5Cdir");
    test_escape!(tab, "a\tb", "a\\09b");
    test_escape!(multibyte, "é", "\\C3\\A9");

    #[test]
    fn identical_contents_share_a_global() {
        let mut pool = StringPool::new();

        let first = pool.intern("%d\n");
        let other = pool.intern("oi");
        let again = pool.intern("%d\n");

        assert_eq!(first, again);
        assert_eq!(first.name, "@.str0");
        assert_eq!(other.name, "@.str1");
        assert_eq!(first.len, 4);
    }

    #[test]
    fn globals_are_sized_in_bytes() {
        let mut pool = StringPool::new();
        pool.intern("é\n");

        let mut out = String::new();
        pool.write_globals(&mut out).unwrap();

        assert_eq!(
            out,
            "@.str0 = private unnamed_addr constant [4 x i8] c\"\\C3\\A9\\0A\\00\"\n"
        );
    }

    #[test]
    fn real_literals_are_exact() {
        assert_eq!(real_literal(1.5), "0x3FF8000000000000");
        assert_eq!(real_literal(0.0), "0x0000000000000000");
    }

    #[test]
    fn values_render_as_typed_operands() {
        assert_eq!(Value::new("%3", Type::Integer).to_string(), "i32 %3");
        assert_eq!(Value::new("@.str0", Type::Text).to_string(), "ptr @.str0");
    }
}
