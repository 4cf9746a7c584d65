use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use apollo::compile::{Compiler, Emit};
use apollo::infra::ExitCode;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EmitArg {
    /// LLVM IR text
    Ir,
    /// Token stream, trivia included
    Tokens,
    /// Parsed syntax tree
    Ast,
}

impl From<EmitArg> for Emit {
    fn from(value: EmitArg) -> Self {
        match value {
            EmitArg::Ir => Emit::Ir,
            EmitArg::Tokens => Emit::Tokens,
            EmitArg::Ast => Emit::Ast,
        }
    }
}

/// Compiles an Apollo program to LLVM IR.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Apollo source file
    src: PathBuf,

    /// Output file, defaults to the source path with an `.ll` extension
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "ir")]
    emit: EmitArg,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let out = args.out.unwrap_or_else(|| args.src.with_extension("ll"));

    let mut compiler = Compiler::new();
    compiler.src(args.src).out(out).emit(args.emit.into());

    let Err(err) = compiler.compile() else {
        return ExitCode::SUCCESS;
    };

    if let Err(report_err) = compiler.report(&err) {
        eprintln!("{report_err}");
    }

    err.into()
}
