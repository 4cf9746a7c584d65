pub mod values;

use std::{collections::HashMap, fmt::Write};

use crate::{
    compile::{
        ast::{BinaryOp, Builtin, Expr, Program, Stmt, Type, UnaryOp, VarDeclaration},
        semantic::symbols::{ScopeId, SymbolTable},
    },
    datastructures::scope_stack::ScopeStack,
    infra::ApolloError,
};

use values::{StringPool, Value, real_literal, type_name, zero};

const READ_BUFFER_SIZE: usize = 256;

const ENTRY_LABEL: &str = "entry";

/// Storage of one variable.
#[derive(Clone, Debug, PartialEq)]
struct Slot {
    address: String,
    ty: Type,
}

/// Position in the symbol table mirrored while walking the program.
#[derive(Clone, Copy, Debug)]
struct Frame {
    scope: Option<ScopeId>,
    opened: usize,
}

/// Translates a checked program into a single `main` function.
///
/// Allocas live in the entry block under named registers; everything else
/// uses numbered registers in emission order. Expression types are derived
/// here from the values themselves, so a program the analyzer would reject
/// still produces well-formed IR.
pub struct Generator<'t> {
    symbols: &'t SymbolTable,
    frames: Vec<Frame>,
    slots: ScopeStack<String, Slot>,
    names: HashMap<String, usize>,
    strings: StringPool,
    prologue: String,
    body: String,
    next_register: usize,
    next_label: usize,
}

impl<'t> Generator<'t> {
    pub fn new(symbols: &'t SymbolTable) -> Self {
        Generator {
            symbols,
            frames: vec![Frame {
                scope: Some(SymbolTable::ROOT),
                opened: 0,
            }],
            slots: ScopeStack::new(1),
            names: HashMap::from([(ENTRY_LABEL.to_string(), 1)]),
            strings: StringPool::new(),
            prologue: String::new(),
            body: String::new(),
            next_register: 0,
            next_label: 0,
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<String, ApolloError> {
        for decl in &program.declarations {
            self.declare(decl)?;
        }

        for stmt in &program.statements {
            self.emit_stmt(stmt)?;
        }

        let mut ir = String::from(include_str!("prelude.ll"));

        writeln!(&mut ir, "define i32 @main() {{")?;
        writeln!(&mut ir, "{ENTRY_LABEL}:")?;
        ir.push_str(&self.prologue);
        ir.push_str(&self.body);
        writeln!(&mut ir, "  ret i32 0")?;
        writeln!(&mut ir, "}}")?;

        if !self.strings.is_empty() {
            writeln!(&mut ir)?;
            self.strings.write_globals(&mut ir)?;
        }

        Ok(ir)
    }

    fn register(&mut self) -> String {
        let register = format!("%{}", self.next_register);
        self.next_register += 1;

        register
    }

    fn label(&mut self) -> usize {
        let label = self.next_label;
        self.next_label += 1;

        label
    }

    /// A local name not used before, `x`, `x.1`, ... Slots and block labels
    /// share this pool, and bases never contain a dot.
    fn local(&mut self, base: &str) -> String {
        let count = self.names.entry(base.to_string()).or_insert(0);
        let name = match *count {
            0 => base.to_string(),
            n => format!("{base}.{n}"),
        };
        *count += 1;

        name
    }

    fn unique_name(&mut self, base: &str) -> String {
        format!("%{}", self.local(base))
    }

    fn alloca(&mut self, base: &str, ty: Type) -> Result<String, ApolloError> {
        let address = self.unique_name(base);
        writeln!(&mut self.prologue, "  {address} = alloca {}", type_name(ty))?;

        Ok(address)
    }

    fn declare(&mut self, decl: &VarDeclaration) -> Result<(), ApolloError> {
        let ty = self
            .frames
            .last()
            .and_then(|frame| frame.scope)
            .and_then(|scope| self.symbols.lookup_local(scope, &decl.name))
            .map_or(decl.ty, |symbol| symbol.ty);

        let address = self.alloca(&decl.name, ty)?;
        writeln!(
            &mut self.body,
            "  store {} {}, ptr {address}",
            type_name(ty),
            zero(ty)
        )?;

        self.slots
            .insert_in_current(decl.name.clone(), Slot { address, ty })?;

        Ok(())
    }

    /// Storage for `name`. Names nobody declared get a zeroed `i32` in the
    /// outermost scope.
    fn slot(&mut self, name: &str) -> Result<Slot, ApolloError> {
        if let Some(slot) = self.slots.lookup(name) {
            return Ok(slot.clone());
        }

        let address = self.alloca(name, Type::Integer)?;
        writeln!(&mut self.prologue, "  store i32 0, ptr {address}")?;

        let slot = Slot {
            address,
            ty: Type::Integer,
        };
        self.slots.insert_at(0, name.to_string(), slot.clone())?;

        Ok(slot)
    }

    fn enter_block(&mut self) {
        let child = match self.frames.last_mut() {
            Some(frame) => {
                let child = frame
                    .scope
                    .and_then(|scope| self.symbols.child(scope, frame.opened));
                frame.opened += 1;
                child
            }
            None => None,
        };

        self.frames.push(Frame {
            scope: child,
            opened: 0,
        });
        self.slots.push();
    }

    fn leave_block(&mut self) {
        self.frames.pop();
        self.slots.pop();
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), ApolloError> {
        match stmt {
            Stmt::Declaration(decl) => self.declare(decl),
            Stmt::Block(block) => {
                self.enter_block();

                for stmt in &block.statements {
                    self.emit_stmt(stmt)?;
                }

                self.leave_block();
                Ok(())
            }
            Stmt::Assignment { target, value, .. } => {
                let slot = self.slot(target)?;

                match value {
                    Expr::Call(Builtin::ReadNumber, _) => self.read_number_into(&slot),
                    Expr::Call(Builtin::ReadText, _) => self.read_text_into(&slot),
                    _ => {
                        let value = self.emit_expr(value)?;
                        self.store(value, &slot)
                    }
                }
            }
            Stmt::If {
                condition,
                then,
                otherwise,
                ..
            } => {
                let id = self.label();
                let then_label = self.local(&format!("then_{id}"));
                let else_label = self.local(&format!("else_{id}"));
                let end_label = self.local(&format!("endif_{id}"));

                let condition = self.emit_condition(condition)?;
                let false_target = match otherwise {
                    Some(_) => &else_label,
                    None => &end_label,
                };
                writeln!(
                    &mut self.body,
                    "  br i1 {}, label %{then_label}, label %{false_target}",
                    condition.repr
                )?;

                writeln!(&mut self.body, "{then_label}:")?;
                self.emit_stmt(then)?;
                writeln!(&mut self.body, "  br label %{end_label}")?;

                if let Some(otherwise) = otherwise {
                    writeln!(&mut self.body, "{else_label}:")?;
                    self.emit_stmt(otherwise)?;
                    writeln!(&mut self.body, "  br label %{end_label}")?;
                }

                writeln!(&mut self.body, "{end_label}:")?;
                Ok(())
            }
            Stmt::While {
                condition, body, ..
            } => {
                let id = self.label();
                let cond_label = self.local(&format!("cond_{id}"));
                let body_label = self.local(&format!("body_{id}"));
                let end_label = self.local(&format!("endwhile_{id}"));

                writeln!(&mut self.body, "  br label %{cond_label}")?;
                writeln!(&mut self.body, "{cond_label}:")?;
                let condition = self.emit_condition(condition)?;
                writeln!(
                    &mut self.body,
                    "  br i1 {}, label %{body_label}, label %{end_label}",
                    condition.repr
                )?;

                writeln!(&mut self.body, "{body_label}:")?;
                self.emit_stmt(body)?;
                writeln!(&mut self.body, "  br label %{cond_label}")?;

                writeln!(&mut self.body, "{end_label}:")?;
                Ok(())
            }
            Stmt::Write { arguments, .. } => {
                for argument in arguments {
                    let value = self.emit_expr(argument)?;
                    self.write(value)?;
                }

                Ok(())
            }
            Stmt::ReadNumber { target, .. } => {
                let slot = self.slot(target)?;
                self.read_number_into(&slot)
            }
            Stmt::ReadText { target, .. } => {
                let slot = self.slot(target)?;
                self.read_text_into(&slot)
            }
        }
    }

    fn emit_condition(&mut self, condition: &Expr) -> Result<Value, ApolloError> {
        let value = self.emit_expr(condition)?;
        self.convert(value, Type::Boolean)
    }

    fn store(&mut self, value: Value, slot: &Slot) -> Result<(), ApolloError> {
        let value = self.convert(value, slot.ty)?;
        writeln!(&mut self.body, "  store {value}, ptr {}", slot.address)?;

        Ok(())
    }

    fn load(&mut self, address: &str, ty: Type) -> Result<Value, ApolloError> {
        let register = self.register();
        writeln!(
            &mut self.body,
            "  {register} = load {}, ptr {address}",
            type_name(ty)
        )?;

        Ok(Value::new(register, ty))
    }

    fn call(&mut self, function: &str, format: &str, argument: &str) -> Result<(), ApolloError> {
        let format = self.strings.intern(format);
        let register = self.register();
        writeln!(
            &mut self.body,
            "  {register} = call i32 (ptr, ...) @{function}(ptr {}, {argument})",
            format.name
        )?;

        Ok(())
    }

    fn write(&mut self, value: Value) -> Result<(), ApolloError> {
        let (format, value) = match value.ty {
            Type::Integer => ("%d\n", value),
            Type::Real => ("%f\n", value),
            Type::Text => ("%s\n", value),
            Type::Boolean => {
                let yes = self.strings.intern("verdadeiro");
                let no = self.strings.intern("falso");
                let register = self.register();
                writeln!(
                    &mut self.body,
                    "  {register} = select i1 {}, ptr {}, ptr {}",
                    value.repr, yes.name, no.name
                )?;

                ("%s\n", Value::new(register, Type::Text))
            }
            Type::Void => return Ok(()),
        };

        self.call("printf", format, &value.to_string())
    }

    fn read_number_into(&mut self, slot: &Slot) -> Result<(), ApolloError> {
        let format = match slot.ty {
            Type::Integer => "%d",
            Type::Real => "%lf",
            _ => {
                let value = self.read_number()?;
                return self.store(value, slot);
            }
        };

        self.call("scanf", format, &format!("ptr {}", slot.address))
    }

    fn read_text_into(&mut self, slot: &Slot) -> Result<(), ApolloError> {
        let value = self.read_text()?;
        self.store(value, slot)
    }

    /// Reads an integer through a scratch slot.
    fn read_number(&mut self) -> Result<Value, ApolloError> {
        let scratch = self.alloca("tmp", Type::Integer)?;
        self.call("scanf", "%d", &format!("ptr {scratch}"))?;

        self.load(&scratch, Type::Integer)
    }

    /// Reads one word into a fresh buffer and yields a pointer to it.
    fn read_text(&mut self) -> Result<Value, ApolloError> {
        let buffer = self.unique_name("buf");
        writeln!(
            &mut self.prologue,
            "  {buffer} = alloca [{READ_BUFFER_SIZE} x i8]"
        )?;

        let pointer = self.register();
        writeln!(
            &mut self.body,
            "  {pointer} = getelementptr inbounds [{READ_BUFFER_SIZE} x i8], ptr {buffer}, i32 0, i32 0"
        )?;

        let format = format!("%{}s", READ_BUFFER_SIZE - 1);
        self.call("scanf", &format, &format!("ptr {pointer}"))?;

        Ok(Value::new(pointer, Type::Text))
    }

    fn emit_expr(&mut self, expr: &Expr) -> Result<Value, ApolloError> {
        match expr {
            Expr::Integer(value, _) => self.literal("add i32 0", &value.to_string(), Type::Integer),
            Expr::Real(value, _) => self.literal("fadd double 0.0", &real_literal(*value), Type::Real),
            Expr::Boolean(value, _) => self.literal("or i1 false", &value.to_string(), Type::Boolean),
            Expr::Text(content, _) => {
                let global = self.strings.intern(content);
                let register = self.register();
                writeln!(
                    &mut self.body,
                    "  {register} = getelementptr inbounds {}, ptr {}, i32 0, i32 0",
                    global.array_type(),
                    global.name
                )?;

                Ok(Value::new(register, Type::Text))
            }
            Expr::Variable(name, _) => {
                let slot = self.slot(name)?;
                self.load(&slot.address, slot.ty)
            }
            Expr::Call(Builtin::ReadNumber, _) => self.read_number(),
            Expr::Call(Builtin::ReadText, _) => self.read_text(),
            Expr::Unary(UnaryOp::Neg, operand, _) => {
                let operand = self.emit_expr(operand)?;

                if operand.ty == Type::Real {
                    return self.instruction(&format!("fneg double {}", operand.repr), Type::Real);
                }

                let operand = self.convert(operand, Type::Integer)?;
                self.instruction(&format!("sub i32 0, {}", operand.repr), Type::Integer)
            }
            Expr::Binary(op, lhs, rhs, _) => {
                let lhs = self.emit_expr(lhs)?;
                let rhs = self.emit_expr(rhs)?;

                self.binary(*op, lhs, rhs)
            }
        }
    }

    /// Materializes a constant in a fresh register.
    fn literal(&mut self, prefix: &str, constant: &str, ty: Type) -> Result<Value, ApolloError> {
        self.instruction(&format!("{prefix}, {constant}"), ty)
    }

    fn instruction(&mut self, instruction: &str, ty: Type) -> Result<Value, ApolloError> {
        let register = self.register();
        writeln!(&mut self.body, "  {register} = {instruction}")?;

        Ok(Value::new(register, ty))
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ApolloError> {
        if op.is_logical() {
            let lhs = self.convert(lhs, Type::Boolean)?;
            let rhs = self.convert(rhs, Type::Boolean)?;
            let mnemonic = if op == BinaryOp::And { "and" } else { "or" };

            return self.instruction(
                &format!("{mnemonic} i1 {}, {}", lhs.repr, rhs.repr),
                Type::Boolean,
            );
        }

        // Operand type both sides are brought to before the instruction.
        let common = if lhs.ty.is_numeric() && rhs.ty.is_numeric() {
            if lhs.ty == Type::Real || rhs.ty == Type::Real {
                Type::Real
            } else {
                Type::Integer
            }
        } else if op.is_equality() && lhs.ty == rhs.ty {
            lhs.ty
        } else {
            Type::Integer
        };

        let lhs = self.convert(lhs, common)?;
        let rhs = self.convert(rhs, common)?;
        let float = common == Type::Real;

        let (instruction, result) = if op.is_arithmetic() {
            let mnemonic = match (op, float) {
                (BinaryOp::Add, false) => "add",
                (BinaryOp::Sub, false) => "sub",
                (BinaryOp::Mul, false) => "mul",
                (BinaryOp::Div, false) => "sdiv",
                (BinaryOp::Add, true) => "fadd",
                (BinaryOp::Sub, true) => "fsub",
                (BinaryOp::Mul, true) => "fmul",
                (_, true) => "fdiv",
                (_, false) => "sdiv",
            };

            (format!("{mnemonic} {lhs}, {}", rhs.repr), common)
        } else {
            let predicate = match (op, float) {
                (BinaryOp::Eq, false) => "icmp eq",
                (BinaryOp::NotEq, false) => "icmp ne",
                (BinaryOp::Less, false) => "icmp slt",
                (BinaryOp::LessEq, false) => "icmp sle",
                (BinaryOp::Greater, false) => "icmp sgt",
                (BinaryOp::GreaterEq, false) => "icmp sge",
                (BinaryOp::Eq, true) => "fcmp oeq",
                (BinaryOp::NotEq, true) => "fcmp one",
                (BinaryOp::Less, true) => "fcmp olt",
                (BinaryOp::LessEq, true) => "fcmp ole",
                (BinaryOp::Greater, true) => "fcmp ogt",
                (_, true) => "fcmp oge",
                (_, false) => "icmp sge",
            };

            (format!("{predicate} {lhs}, {}", rhs.repr), Type::Boolean)
        };

        self.instruction(&instruction, result)
    }

    /// Converts `value` to `target`. Integer to Real is the only conversion
    /// a valid program needs; the rest keep rejected programs well-formed.
    fn convert(&mut self, value: Value, target: Type) -> Result<Value, ApolloError> {
        if value.ty == target || value.ty == Type::Void || target == Type::Void {
            return Ok(value);
        }

        let repr = &value.repr;
        let instruction = match (value.ty, target) {
            (Type::Integer, Type::Real) => format!("sitofp i32 {repr} to double"),
            (Type::Real, Type::Integer) => format!("fptosi double {repr} to i32"),
            (Type::Boolean, Type::Integer) => format!("zext i1 {repr} to i32"),
            (Type::Boolean, Type::Real) => format!("uitofp i1 {repr} to double"),
            (Type::Integer, Type::Boolean) => format!("icmp ne i32 {repr}, 0"),
            (Type::Real, Type::Boolean) => format!("fcmp one double {repr}, 0.0"),
            (Type::Text, Type::Boolean) => format!("icmp ne ptr {repr}, null"),
            (Type::Text, Type::Integer) => format!("ptrtoint ptr {repr} to i32"),
            (Type::Integer, Type::Text) => format!("inttoptr i32 {repr} to ptr"),
            _ => {
                let integer = self.convert(value, Type::Integer)?;
                return self.convert(integer, target);
            }
        };

        self.instruction(&instruction, target)
    }
}

pub fn generate(program: &Program, symbols: &SymbolTable) -> Result<String, ApolloError> {
    Generator::new(symbols).generate(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{parser::parse, semantic::analyze};

    fn compile(body: &str) -> String {
        let source = format!("algoritmo teste\n{body}\nfim_algoritmo");
        let program = parse(&source).expect("expected test case source to parse");
        let analysis = analyze(&program);

        generate(&program, &analysis.symbols).expect("generation never fails on strings")
    }

    /// Instruction lines of the body, without the shared prologue.
    fn body(ir: &str) -> Vec<&str> {
        ir.lines()
            .skip_while(|line| !line.starts_with("entry:"))
            .skip(1)
            .take_while(|line| *line != "}")
            .collect()
    }

    // Macro to generate test cases.
    macro_rules! test_emits {
        ($name:ident, $source:literal, [$($line:literal),* $(,)?]) => {
            #[test]
            fn $name() {
                let ir = compile($source);
                let body = body(&ir);

                $(
                    assert!(
                        body.iter().any(|line| line.trim() == $line),
                        "missing `{}` in\n{}",
                        $line,
                        ir
                    );
                )*
            }
        };
    }

    test_emits!(
        integer_declaration,
        "inteiro x",
        ["%x = alloca i32", "store i32 0, ptr %x"]
    );
    test_emits!(
        zero_values_per_type,
        "real r\ntexto t\nlogico b",
        ["store double 0.0, ptr %r", "store ptr null, ptr %t", "store i1 false, ptr %b"]
    );
    test_emits!(
        integer_literal_assignment,
        "inteiro x\nx = 5",
        ["%0 = add i32 0, 5", "store i32 %0, ptr %x"]
    );
    test_emits!(
        promotion_on_store,
        "real r\nr = 2",
        ["%0 = add i32 0, 2", "%1 = sitofp i32 %0 to double", "store double %1, ptr %r"]
    );
    test_emits!(
        mixed_arithmetic_uses_float_ops,
        "real r\ninteiro i\nr = i * 1.5",
        [
            "%0 = load i32, ptr %i",
            "%1 = fadd double 0.0, 0x3FF8000000000000",
            "%2 = sitofp i32 %0 to double",
            "%3 = fmul double %2, %1",
        ]
    );
    test_emits!(
        integer_division_is_signed,
        "inteiro x\nx = x / 2",
        ["%2 = sdiv i32 %0, %1"]
    );
    test_emits!(
        real_comparison_is_ordered,
        "real r\nlogico b\nb = r <= 1.0",
        ["%2 = fcmp ole double %0, %1"]
    );
    test_emits!(
        text_equality_compares_pointers,
        "texto t\nlogico b\nb = t == \"a\"",
        ["%2 = icmp eq ptr %0, %1"]
    );
    test_emits!(
        logical_operators,
        "logico a, b\na = a && b || a",
        ["%2 = and i1 %0, %1", "%4 = or i1 %2, %3"]
    );
    test_emits!(
        negation,
        "inteiro x\nreal r\nx = -x\nr = -r",
        ["%1 = sub i32 0, %0", "%3 = fneg double %2"]
    );
    test_emits!(
        write_integer,
        "escreva(42)",
        ["%1 = call i32 (ptr, ...) @printf(ptr @.str0, i32 %0)"]
    );
    test_emits!(
        write_boolean_selects_word,
        "escreva(verdadeiro)",
        [
            "%0 = or i1 false, true",
            "%1 = select i1 %0, ptr @.str0, ptr @.str1",
            "%2 = call i32 (ptr, ...) @printf(ptr @.str2, ptr %1)",
        ]
    );
    test_emits!(
        read_number_into_real,
        "real r\nleia_numero(r)",
        ["%0 = call i32 (ptr, ...) @scanf(ptr @.str0, ptr %r)"]
    );
    test_emits!(
        read_number_assignment_reads_in_place,
        "inteiro n\nn = leia_numero()",
        ["%0 = call i32 (ptr, ...) @scanf(ptr @.str0, ptr %n)"]
    );
    test_emits!(
        read_text_uses_a_buffer,
        "texto t\nleia_texto(t)",
        [
            "%buf = alloca [256 x i8]",
            "%0 = getelementptr inbounds [256 x i8], ptr %buf, i32 0, i32 0",
            "%1 = call i32 (ptr, ...) @scanf(ptr @.str0, ptr %0)",
            "store ptr %0, ptr %t",
        ]
    );
    test_emits!(
        read_call_inside_expression,
        "inteiro n\nn = leia_numero() + 1",
        [
            "%tmp = alloca i32",
            "%0 = call i32 (ptr, ...) @scanf(ptr @.str0, ptr %tmp)",
            "%1 = load i32, ptr %tmp",
            "%3 = add i32 %1, %2",
        ]
    );
    test_emits!(
        undeclared_names_get_an_integer_slot,
        "y = 3",
        ["%y = alloca i32", "store i32 0, ptr %y", "store i32 %0, ptr %y"]
    );
    test_emits!(
        shadowed_variables_get_distinct_slots,
        "inteiro x\n{ real x\n x = 1.0 }\nx = 1",
        ["%x = alloca i32", "%x.1 = alloca double", "store double %0, ptr %x.1", "store i32 %1, ptr %x"]
    );

    #[test]
    fn module_layout() {
        let ir = compile("escreva(\"oi\")");
        let lines: Vec<_> = ir.lines().collect();

        assert!(lines[0].starts_with(';'));
        assert!(lines.contains(&"declare i32 @printf(ptr, ...)"));
        assert!(lines.contains(&"declare i32 @scanf(ptr, ...)"));

        let main = lines.iter().position(|l| *l == "define i32 @main() {").unwrap();
        let end = lines.iter().position(|l| *l == "}").unwrap();
        assert_eq!(lines[end - 1], "  ret i32 0");
        assert!(main < end);

        let globals: Vec<_> = lines[end..].iter().filter(|l| l.starts_with("@.str")).collect();
        assert_eq!(
            globals,
            vec![
                &"@.str0 = private unnamed_addr constant [3 x i8] c\"oi\\00\"",
                &"@.str1 = private unnamed_addr constant [4 x i8] c\"%s\\0A\\00\"",
            ]
        );
    }

    #[test]
    fn string_literals_are_interned_once() {
        let ir = compile("escreva(\"a\")\nescreva(\"a\")\nescreva(\"b\")");

        let globals = ir.lines().filter(|l| l.starts_with("@.str")).count();
        assert_eq!(globals, 3);
    }

    #[test]
    fn if_without_else_branches_to_end() {
        let ir = compile("logico c\nse c faca escreva(1)");
        let body = body(&ir);

        assert!(body.contains(&"  br i1 %0, label %then_0, label %endif_0"));
        assert!(body.contains(&"then_0:"));
        assert!(body.contains(&"endif_0:"));
        assert!(!ir.contains("else_0"));
    }

    #[test]
    fn if_with_else_joins_both_arms() {
        let ir = compile("logico c\nse c faca escreva(1) senao escreva(2)");
        let body = body(&ir);

        assert!(body.contains(&"  br i1 %0, label %then_0, label %else_0"));
        assert_eq!(
            body.iter().filter(|l| **l == "  br label %endif_0").count(),
            2
        );
    }

    #[test]
    fn while_is_a_pre_test_loop() {
        let ir = compile("inteiro i\nenquanto i < 3 faca i = i + 1");
        let body = body(&ir);

        let start = body.iter().position(|l| *l == "  br label %cond_0").unwrap();
        assert_eq!(body[start + 1], "cond_0:");
        assert!(body.contains(&"  br i1 %2, label %body_0, label %endwhile_0"));
        assert_eq!(
            body.iter().filter(|l| **l == "  br label %cond_0").count(),
            2
        );
        assert!(body.contains(&"endwhile_0:"));
    }

    #[test]
    fn integer_conditions_compare_against_zero() {
        let ir = compile("inteiro i\nse i faca ;");
        assert!(body(&ir).contains(&"  %1 = icmp ne i32 %0, 0"));
    }

    #[test]
    fn nested_control_flow_uses_distinct_labels() {
        let ir = compile("logico c\nenquanto c faca se c faca c = falso");

        assert!(ir.contains("cond_0:"));
        assert!(ir.contains("then_1:"));
        assert!(ir.contains("endif_1:"));
    }

    /// Every `%name = ...` definition and `name:` label of the body.
    fn local_definitions(ir: &str) -> Vec<String> {
        body(ir)
            .iter()
            .filter_map(|line| {
                let line = line.trim();
                match line.strip_suffix(':') {
                    Some(label) => Some(label.to_string()),
                    None => line
                        .strip_prefix('%')
                        .and_then(|rest| rest.split(" = ").next())
                        .map(str::to_string),
                }
            })
            .chain(std::iter::once("entry".to_string()))
            .collect()
    }

    #[test]
    fn variables_named_like_labels_get_their_own_slots() {
        let ir = compile(
            "inteiro entry, cond_0, then_1\n\
             entry = 1\n\
             enquanto cond_0 < 3 faca cond_0 = cond_0 + 1\n\
             se then_1 == 0 faca escreva(entry)",
        );
        let body = body(&ir);

        assert!(body.contains(&"  %entry.1 = alloca i32"));
        assert!(body.contains(&"  %cond_0 = alloca i32"));
        assert!(body.contains(&"  br label %cond_0.1"));
        assert!(body.contains(&"cond_0.1:"));
        assert!(body.contains(&"then_1.1:"));

        let mut names = local_definitions(&ir);
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total, "duplicate local names in\n{ir}");
    }

    #[test]
    fn generation_is_deterministic() {
        let source = "algoritmo t inteiro x real y texto s x = 1 y = x * 2.5 s = \"ola\" \
                      enquanto x < 10 faca { x = x + 1 escreva(x, y, s, x > 2) } fim_algoritmo";
        let program = parse(source).unwrap();
        let symbols = analyze(&program).into_result().unwrap();

        let first = generate(&program, &symbols).unwrap();
        let second = generate(&program, &symbols).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn registers_are_numbered_in_order() {
        let ir = compile("inteiro x\nx = 1 + 2\nescreva(x * 3)");

        let numbered: Vec<usize> = body(&ir)
            .iter()
            .filter_map(|l| l.trim().strip_prefix('%'))
            .filter_map(|l| l.split(' ').next())
            .filter_map(|r| r.parse().ok())
            .collect();

        assert_eq!(numbered, (0..numbered.len()).collect::<Vec<_>>());
    }
}
