use std::{io::BufRead, path::PathBuf};

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};

use cmmc::{
    analyze, compile,
    errors::report_compile_error,
    frontend::{SourceFile, SourceFileOrigin},
    middle::tac::interp::Machine,
};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    source_file: PathBuf,

    /// Stop after parsing and dump the syntax tree
    #[arg(short = 'p', long = "parse")]
    parse_only: bool,

    /// Stop after name analysis and dump the symbol bindings
    #[arg(short = 'n', long = "names")]
    names_only: bool,

    /// Stop after type analysis
    #[arg(short = 'c', long = "check")]
    check_only: bool,

    /// Write three address code to the given file, or to stdout for `-`
    #[arg(short = 'a', long = "tac", value_name = "FILE")]
    tac_output: Option<PathBuf>,

    /// Compile and run the program, reading input from stdin
    #[arg(short = 'r', long = "run")]
    run: bool,
}

fn main() {
    let args = Args::parse();

    if !args.source_file.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!(
                    "Source file '{}' does not exist!",
                    args.source_file.display()
                ),
            )
            .exit()
    }

    if !args.source_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!(
                    "Input path '{}' is not a file!",
                    args.source_file.display()
                ),
            )
            .exit()
    }

    let contents = std::fs::read_to_string(&args.source_file)
        .expect("Failed to read input file (or invalid UTF-8)");

    let source_file = SourceFile {
        contents,
        origin: SourceFileOrigin::File(args.source_file.clone()),
    };

    if args.parse_only {
        let program = cmmc::frontend::parser::Parser::parse_program(&source_file);
        println!("{program:#?}");
        return;
    }

    if args.names_only || args.check_only {
        match analyze(&source_file) {
            Ok((_, resolution, _)) => {
                if args.names_only {
                    println!("{resolution:#?}");
                }
            }
            Err(error) => {
                report_compile_error(&source_file, &error);
                std::process::exit(1);
            }
        }

        return;
    }

    let program = match compile(&source_file) {
        Ok(program) => program,
        Err(error) => {
            report_compile_error(&source_file, &error);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.tac_output {
        if path.as_os_str() == "-" {
            print!("{program}");
        } else {
            let text = strip_ansi_escapes::strip_str(program.to_string());

            if let Err(error) = std::fs::write(path, text) {
                eprintln!("Failed to write '{}': {error}", path.display());
                std::process::exit(1);
            }
        }
    }

    if args.run {
        let input = std::io::stdin()
            .lock()
            .lines()
            .map_while(Result::ok)
            .collect::<Vec<_>>();

        match Machine::new(&program, input).run() {
            Ok(output) => {
                for line in output {
                    println!("{line}");
                }
            }
            Err(error) => {
                eprintln!("runtime error: {error}");
                std::process::exit(1);
            }
        }
    }
}
