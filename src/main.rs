//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, Context};
use armc::{codegen, error::Diagnostics, parse};
use clap::{self, crate_version, Arg};

use std::{
    fs::{self, File},
    io::{self, Read, Write},
    process,
};

use tracing::Level;

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::Command::new("armc")
        .version(crate_version!())
        .about("Compiles a JavaScript subset to ARM assembly")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .default_value("-")
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .help("Log compiler progress to stderr (repeat for more detail)"),
        )
        .get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    // Ambos tienen valores por omisión
    let input = args.value_of("input").unwrap_or("-");
    let output = args.value_of("output").unwrap_or("-");

    let text = match input {
        "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;

            text
        }

        path => fs::read_to_string(path)
            .with_context(|| format!("Failed to open for reading: {}", path))?,
    };

    tracing::info!(input, bytes = text.len(), "compiling");

    let program = match parse::parse(&text) {
        Ok(program) => program,
        Err(error) => fail(Diagnostics::from(error).origin(input)),
    };

    let lines = match codegen::generate(&program) {
        Ok(lines) => lines,
        Err(error) => fail(Diagnostics::from(error).origin(input)),
    };

    match output {
        "-" => {
            let mut stdout = io::stdout().lock();
            write_lines(&lines, &mut stdout).context("Failed to emit to stdout")?;
        }

        path => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            write_lines(&lines, &mut file)
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }
    }

    tracing::info!(output, lines = lines.len(), "done");
    Ok(())
}

fn write_lines<W: Write>(lines: &[String], output: &mut W) -> io::Result<()> {
    for line in lines {
        writeln!(output, "{}", line)?;
    }

    output.flush()
}

fn fail(diagnostics: Diagnostics) -> ! {
    eprint!("{}", diagnostics);
    process::exit(1);
}
