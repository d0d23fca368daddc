use clap::{CommandFactory, Parser};
use ispnublib::{CompilerConfig, IspnubError, Layout, MemoryImage, ScriptCompiler};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

/// HEX file creator for ISPnub modules
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// ISP script to compile
    scriptfile: Option<PathBuf>,

    /// Output Intel HEX file
    #[arg(default_value = "ispnub.hex")]
    outfile: PathBuf,

    /// Programmer base firmware placed in front of the command stream
    #[arg(short, long, value_name = "HEXFILE")]
    base: Option<PathBuf>,
}

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!("ISPnubCreator v{version}");
    println!("HEX file creator for ISPnub modules");
    println!();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    print_banner();

    let Some(scriptfile) = args.scriptfile.as_deref() else {
        let _ = Args::command().print_help();
        return;
    };

    if let Err(e) = run(scriptfile, &args.outfile, args.base.as_deref()) {
        println!();
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(scriptfile: &Path, outfile: &Path, base: Option<&Path>) -> Result<(), IspnubError> {
    let layout = Layout::default();

    // Prepare controller flash
    let mut mem = MemoryImage::new(layout.controller_memory_size);
    if let Some(base) = base {
        let end = mem.load_hex(base, 0)?;
        if end > layout.script_start {
            log::warn!(
                "Base firmware ends at 0x{end:X} and overlaps the script region at 0x{:X}",
                layout.script_start
            );
        }
    } else {
        log::warn!("No base firmware given, output holds the command stream only");
    }

    print!("Parse script file \"{}\"...", scriptfile.display());
    let _ = std::io::stdout().flush();
    let compiler = ScriptCompiler::new(CompilerConfig::new(&layout));
    let end = compiler.compile_file(scriptfile, &mut mem, layout.script_start)?;
    println!(" done.");

    print!("Write output file \"{}\"...", outfile.display());
    let _ = std::io::stdout().flush();
    mem.write_hex(outfile, end)?;
    println!(" done.");

    println!();
    println!("Finished! Now you can flash the ISPnub module, e.g. with avrdude:");
    println!(
        "avrdude -c YOURPROGRAMMER -p atmega1284p -U hfuse:w:0xD9:m -U lfuse:w:0xE2:m -U flash:w:{} -U lock:w:0x3C:m",
        outfile.display()
    );
    println!();

    Ok(())
}
