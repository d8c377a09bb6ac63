//! acc8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `acc8-emu run <program>` - Run an image or ASM file
//! - `acc8-emu debug <program>` - Interactive debugger
//! - `acc8-emu asm <source>` - Assemble to an image file
//! - `acc8-emu disasm <image>` - Disassemble an image file
//! - `acc8-emu isa` - Print the microcode table
//! - `acc8-emu demo` - Trace the built-in demonstration program

use acc8::{InstructionSet, Memory};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "acc8-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A cycle-accurate microcoded 8-bit accumulator computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or the cycle budget runs out
    Run {
        /// Path to the image (.img, .json) or ASM file to execute
        program: String,
        /// Maximum number of clock cycles to run
        #[arg(short, long, default_value = "1000")]
        max_cycles: u64,
        /// Print every cycle
        #[arg(short, long)]
        trace: bool,
        /// Print trace records as JSON lines
        #[arg(long)]
        json: bool,
        /// Instruction-set revision to decode with
        #[arg(long, value_enum, default_value_t = Isa::Extended)]
        isa: Isa,
    },
    /// Interactive debugger
    Debug {
        /// Path to the image or ASM file to debug
        program: String,
    },
    /// Assemble source to an image file
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file (.img or .json)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
    /// Print the microcode table
    Isa {
        #[arg(long, value_enum, default_value_t = Isa::Extended)]
        isa: Isa,
    },
    /// Trace the built-in demonstration program
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum Isa {
    Basic,
    Extended,
}

impl From<Isa> for InstructionSet {
    fn from(isa: Isa) -> Self {
        match isa {
            Isa::Basic => InstructionSet::Basic,
            Isa::Extended => InstructionSet::Extended,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, json, isa }) => {
            let mem = load_or_exit(&program);
            println!("🔧 Running: {}", program);
            run_program(mem, isa.into(), max_cycles, trace, json);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        Some(Commands::Isa { isa }) => {
            print!("{}", acc8::trace::format_decoder(&InstructionSet::from(isa).decoder()));
        }
        Some(Commands::Demo) => {
            run_program(acc8::programs::demo(), InstructionSet::Extended, 1000, true, false);
        }
        None => {
            println!("acc8 Emulator v0.1.0");
            println!("A microcoded 8-bit accumulator computer");
            println!();
            println!("Use --help for available commands");
            println!();
            run_program(acc8::programs::demo(), InstructionSet::Extended, 1000, true, false);
        }
    }
}

fn load_or_exit(path: &str) -> Memory {
    match acc8::load_image(path) {
        Ok(mem) => {
            if mem.is_empty() {
                log::warn!("{} has no cells; every address reads as 0", path);
            }
            mem
        }
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn run_program(mem: Memory, isa: InstructionSet, max_cycles: u64, trace: bool, json: bool) {
    use acc8::trace::{format_record, format_report, json_record};

    let decoder = isa.decoder();

    println!();
    println!("━━━ Execution ━━━");

    let report = acc8::run_traced(mem, &decoder, max_cycles, |record| {
        log::trace!("{}", format_record(record));
        if json {
            match json_record(record) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("cannot encode cycle {}: {}", record.cycle, e),
            }
        } else if trace {
            println!("{}", format_record(record));
        }
    });

    println!();
    println!("━━━ Result ━━━");
    println!("{}", format_report(&report));

    if !report.halted() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
        std::process::exit(2);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    let mem = load_or_exit(path);

    println!("🔍 Loaded {} cells from {}", mem.len(), path);
    println!("🚀 Launching debugger...");

    if let Err(e) = acc8::run_debugger(mem) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    eprintln!("❌ Built without the `tui` feature");
    std::process::exit(1);
}

/// Default image path for a source file: same stem, `.img` extension.
fn image_path(source_path: &str) -> PathBuf {
    Path::new(source_path).with_extension("img")
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.map_or_else(|| image_path(source_path), PathBuf::from);
    if out_path == Path::new(source_path) {
        eprintln!("❌ Refusing to overwrite the source file {}", source_path);
        std::process::exit(1);
    }

    println!("📝 Assembling: {} → {}", source_path, out_path.display());

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let mem = match acc8::assemble(&source) {
        Ok(mem) => mem,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} bytes", mem.len());

    if let Err(e) = acc8::save_image(&out_path, &mem) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path.display());
}

fn disassemble_file(image_path: &str) {
    println!("📖 Disassembling: {}", image_path);
    println!();

    let mem = load_or_exit(image_path);
    println!("{}", acc8::disassemble(&mem));
}
