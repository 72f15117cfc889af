use std::path::{Path, PathBuf};

use clap::Parser;
use color_print::{ceprintln, cprintln};

use arch::inst::Inst;
use arch::layout::USER_BASE;

use msasm::assemble::{assemble, Program};
use msasm::bios::{BIOS_IMAGE, INT_IMAGE};
use msasm::emit;
use msasm::error::Error;
use msasm::linker::{self, LinkedImage};

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input assembly file
    input: String,

    /// Output directory
    out_dir: String,

    /// Emit the builtin BIOS image only, ignoring the input program
    #[clap(short = 's', long)]
    bios_only: bool,

    /// Verbose stage-by-stage output
    #[clap(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();
    std::process::exit(run(&args));
}

fn run(args: &Args) -> i32 {
    if args.bios_only {
        return match emit_bios(args) {
            Ok(()) => 0,
            Err(err) => {
                ceprintln!("<red,bold>error</>: {}", err);
                1
            }
        };
    }

    let source = match std::fs::read_to_string(&args.input) {
        Ok(s) => s,
        Err(e) => {
            let err = Error::FileOpen(args.input.clone(), e);
            ceprintln!("<red,bold>error</>: {}", err);
            return 1;
        }
    };
    match build(args, &source) {
        Ok(()) => 0,
        Err(err) => {
            err.print_diag(&args.input, &source);
            1
        }
    }
}

fn build(args: &Args, source: &str) -> Result<(), Error> {
    if args.debug {
        cprintln!("<bold>1. Assemble</> {}", args.input);
    }
    let program = assemble(source)?;
    if args.debug {
        println!("  - {} instruction(s)", program.text.len());
        println!("  - {} symbol(s)", program.symbols.len());
        println!("  - {} data byte(s)", program.data.len());
        dump_listing(&program);
        cprintln!("<bold>2. Link</>");
    }

    let image = linker::link(&program, &BIOS_IMAGE, &INT_IMAGE)?;

    if args.debug {
        cprintln!("<bold>3. Emit</>");
    }
    write_outputs(args, &program, &image)
}

fn dump_listing(program: &Program) {
    let (pmmap, _) = linker::memory_maps(program);
    for encoded in &program.text {
        let here = USER_BASE + encoded.addr;
        // Annotate branch/jump targets with the label they land on
        let target = match encoded.inst {
            Inst::B { imm, .. } | Inst::J { imm, .. } => Some(here.wrapping_add(imm as u32)),
            _ => None,
        };
        let note = target
            .and_then(|t| pmmap.get_by_right(&t))
            .map(|name| format!("  ; {name}"))
            .unwrap_or_default();
        println!(
            "  [{:04x}] {:08x} | {}{}",
            here,
            encoded.word,
            encoded.inst.cformat(),
            note
        );
    }
}

fn write_outputs(args: &Args, program: &Program, image: &LinkedImage) -> Result<(), Error> {
    let out_dir = PathBuf::from(&args.out_dir);
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| Error::FileCreate(args.out_dir.clone(), e))?;

    let stem = Path::new(&args.input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());

    let text_path = out_dir.join(format!("{stem}_text.coe"));
    emit::write_file(&text_path, &emit::coe_string(&image.text))?;
    println!("  > {}", text_path.display());

    // The data COE is omitted for programs without a data segment
    if !image.data.is_empty() {
        let data_path = out_dir.join(format!("{stem}_data.coe"));
        emit::write_file(&data_path, &emit::coe_string(&program.data.words()))?;
        println!("  > {}", data_path.display());
    }

    let serial_path = out_dir.join(format!("{stem}_serial.txt"));
    emit::write_file(&serial_path, &emit::serial_string(&program.words(), &image.data))?;
    println!("  > {}", serial_path.display());

    println!("Assembled and linked successfully.");
    Ok(())
}

fn emit_bios(args: &Args) -> Result<(), Error> {
    let out_dir = PathBuf::from(&args.out_dir);
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| Error::FileCreate(args.out_dir.clone(), e))?;

    let text_path = out_dir.join("bios_text.coe");
    emit::write_file(&text_path, &emit::coe_string(&BIOS_IMAGE))?;
    println!("  > {}", text_path.display());

    let serial_path = out_dir.join("bios_serial.txt");
    emit::write_file(&serial_path, &emit::serial_string(&BIOS_IMAGE, &[]))?;
    println!("  > {}", serial_path.display());

    println!("BIOS image emitted.");
    Ok(())
}
