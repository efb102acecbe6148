use std::{env, fs, path::Path, process::ExitCode};

use tuplevm::{
    bytecode::{
        image::{CodeImage, read_image, run_program},
        op_code::disassemble,
        validate::validate_code,
    },
    diagnostics::Reporter,
    runtime::{
        config::{DispatchMode, RunConfig},
        gc::GcHeap,
        portray::portray,
        system::System,
        value::Value,
    },
};

fn main() -> ExitCode {
    let mut args: Vec<String> = env::args().collect();
    let verbose = take_flag(&mut args, "--verbose");
    let trace = take_flag(&mut args, "--trace");
    let threaded = take_flag(&mut args, "--threaded");
    let disasm = take_flag(&mut args, "--disasm");

    let config_path = match take_option(&mut args, "--config") {
        Ok(value) => value,
        Err(message) => return usage_error(&message),
    };
    let quantum = match take_number(&mut args, "--quantum") {
        Ok(value) => value,
        Err(message) => return usage_error(&message),
    };
    let gc_every = match take_number(&mut args, "--gc-every") {
        Ok(value) => value,
        Err(message) => return usage_error(&message),
    };

    let mut config = match &config_path {
        Some(path) => match RunConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(err) => return fail(&err.to_string()),
        },
        None => RunConfig::default(),
    };
    if let Some(quantum) = quantum {
        config.quantum = quantum;
    }
    if let Some(every) = gc_every {
        config.collect_every = Some(every);
    }
    if threaded {
        config.dispatch = DispatchMode::Threaded;
    }
    config.trace |= trace;
    config.verbose |= verbose;
    if let Err(err) = config.validate() {
        return fail(&err.to_string());
    }

    if args.len() < 2 {
        print_help();
        return ExitCode::SUCCESS;
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
            ExitCode::SUCCESS
        }
        "run" => {
            if args.len() != 3 {
                return usage_error("Usage: tuplevm run <image> [flags]");
            }
            run_command(&args[2], config, disasm)
        }
        "thaw" => {
            if args.len() < 3 || args.len() > 4 {
                return usage_error("Usage: tuplevm thaw <image> [out]");
            }
            thaw_command(&args[2], args.get(3).map(String::as_str), config)
        }
        "inspect" => {
            if args.len() != 3 {
                return usage_error("Usage: tuplevm inspect <image>");
            }
            inspect_command(&args[2], config)
        }
        other => usage_error(&format!("unknown command '{}'", other)),
    }
}

fn print_help() {
    println!(
        "\
tuplevm

Usage:
  tuplevm run <image>
  tuplevm thaw <image> [out]
  tuplevm inspect <image>

Flags:
  --config <path>    Load run settings from a JSON file
  --quantum <n>      Instructions per scheduler turn (default: 100)
  --threaded         Use direct-threaded dispatch
  --trace            Print every executed instruction to stderr
  --gc-every <n>     Collect garbage every n scheduler rounds
  --disasm           Print the code before running it
  --verbose          Print phase summaries and run statistics
"
    );
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let present = args.iter().any(|arg| arg == flag);
    if present {
        args.retain(|arg| arg != flag);
    }
    present
}

fn take_option(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, String> {
    let mut found = None;
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            if i + 1 >= args.len() {
                return Err(format!("Usage: tuplevm <command> {} <value>", flag));
            }
            found = Some(args.remove(i + 1));
            args.remove(i);
            continue;
        }
        i += 1;
    }
    Ok(found)
}

fn take_number(args: &mut Vec<String>, flag: &str) -> Result<Option<u32>, String> {
    match take_option(args, flag)? {
        None => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("Error: {} expects a non-negative integer.", flag)),
    }
}

fn usage_error(message: &str) -> ExitCode {
    eprintln!("{}", message);
    ExitCode::from(2)
}

fn fail(message: &str) -> ExitCode {
    eprintln!("Error: {}", message);
    ExitCode::FAILURE
}

fn load(sys: &mut System, path: &str) -> Result<CodeImage, ExitCode> {
    let image = read_image(sys, path).map_err(|err| fail(&err.to_string()))?;
    if sys.config.verbose {
        eprintln!(
            "[load] {}: {} bytes, sha256 {}",
            path,
            image.size,
            image.fingerprint()
        );
    }
    Ok(image)
}

fn run_command(path: &str, config: RunConfig, disasm: bool) -> ExitCode {
    let verbose = config.verbose;
    let mut sys = System::new(config);
    let image = match load(&mut sys, path) {
        Ok(image) => image,
        Err(code) => return code,
    };

    let mut reporter = Reporter::new("Validating", verbose);
    if let Err(err) = validate_code(&sys.heap, image.term, &mut reporter) {
        return fail(&err.to_string());
    }
    eprint!("{}", reporter.render());
    if reporter.has_errors() {
        return ExitCode::FAILURE;
    }

    if disasm {
        if let Some(handle) = image.term.handle() {
            match disassemble(&sys.heap, handle) {
                Ok(listing) => print!("{}", listing),
                Err(err) => return fail(&err.to_string()),
            }
        }
    }

    match run_program(&mut sys, image.term) {
        Ok(report) => {
            if verbose {
                eprintln!(
                    "[gc] {} allocations, {} collections, {} live objects ({} bytes)",
                    sys.heap.total_allocations(),
                    sys.heap.total_collections(),
                    sys.heap.live_count(),
                    sys.heap.live_bytes()
                );
                eprintln!("[run] {} processes reaped", report.reaped);
            }
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err.to_string()),
    }
}

fn thaw_command(path: &str, out: Option<&str>, config: RunConfig) -> ExitCode {
    let mut sys = System::new(config);
    let image = match load(&mut sys, path) {
        Ok(image) => image,
        Err(code) => return code,
    };
    let text = match portray(&sys.heap, image.term) {
        Ok(text) => text,
        Err(err) => return fail(&err.to_string()),
    };
    match out {
        Some(out) => {
            if let Err(err) = fs::write(out, &text) {
                return fail(&format!("could not write '{}': {}", out, err));
            }
        }
        None => println!("{}", text),
    }
    ExitCode::SUCCESS
}

fn inspect_command(path: &str, config: RunConfig) -> ExitCode {
    let mut sys = System::new(config);
    let image = match load(&mut sys, path) {
        Ok(image) => image,
        Err(code) => return code,
    };
    println!("image:       {}", path);
    println!("bytes:       {}", image.size);
    println!("sha256:      {}", image.fingerprint());
    println!("term:        {}", describe(&sys.heap, image.term));

    if matches!(image.term, Value::Tuple(_)) {
        let mut reporter = Reporter::new("Validating", true);
        match validate_code(&sys.heap, image.term, &mut reporter) {
            Ok(instructions) => {
                println!("instructions: {}", instructions);
                print!("{}", reporter.render());
            }
            Err(err) => return fail(&err.to_string()),
        }
    }
    ExitCode::SUCCESS
}

fn describe(heap: &GcHeap, value: Value) -> String {
    match value {
        Value::Tuple(handle) => match heap.tuple_size(handle) {
            Ok(size) => format!("Tuple of {} slots", size),
            Err(err) => format!("Tuple ({})", err),
        },
        Value::Symbol(_) => match heap.symbol_bytes(value) {
            Ok(bytes) => format!("Symbol of {} bytes", bytes.len()),
            Err(err) => format!("Symbol ({})", err),
        },
        other => other.type_name().to_string(),
    }
}
