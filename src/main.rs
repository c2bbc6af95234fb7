use log::{debug, info};
use segvm::config::EngineConfig;
use segvm::opcodes_math::MathOp;
use segvm::reg::Reg;
use segvm::segment::SegmentKind;
use segvm::vm::Machine;
use std::env;

fn print_usage(program: &str) {
    println!("segvm - evaluate script VM math opcodes on segmented register values");
    println!();
    println!(
        "Usage: {} [--config FILE] [--segment KIND[:CELLS]]... <op> <left> [right]",
        program
    );
    println!("Examples:");
    println!("  {} add 0:5 0:3", program);
    println!("  {} --segment script:128 sub 0001:0064 0001:0028", program);
    println!("  {} --config gk1.toml gt? 0002:0040 7", program);
    println!();
    println!("Values are written as ssss:oooo (hex), 0x1234, 1234 or -12.");
    println!("Segments given with --segment are allocated in order from id 0001.");
    println!("Set RUST_LOG=debug to trace each opcode.");
}

fn parse_segment(spec: &str) -> Result<(SegmentKind, usize), String> {
    let (name, cells) = match spec.split_once(':') {
        Some((name, cells)) => (
            name,
            cells
                .parse::<usize>()
                .map_err(|_| format!("Invalid cell count in segment '{}'", spec))?,
        ),
        None => (spec, 0),
    };
    let kind = SegmentKind::from_name(name).ok_or_else(|| format!("Unknown segment kind: {}", name))?;
    Ok((kind, cells))
}

fn parse_reg(text: &str) -> Result<Reg, String> {
    text.parse::<Reg>().map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("segvm");

    let mut config_path = None;
    let mut segments = Vec::new();
    let mut positional = Vec::new();

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => {
                let path = rest.next().ok_or("--config needs a file")?;
                config_path = Some(path.clone());
            }
            "--segment" => {
                let spec = rest.next().ok_or("--segment needs a kind")?;
                segments.push(parse_segment(spec)?);
            }
            "-h" | "--help" => {
                print_usage(program);
                return Ok(());
            }
            _ => positional.push(arg.clone()),
        }
    }

    let config = match &config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    // Initialize logging; RUST_LOG overrides the configured filter
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter.as_str())).init();

    if let Some(path) = &config_path {
        info!(
            "Loaded {} with {} workaround(s)",
            path,
            config.workarounds.len()
        );
    }

    if positional.len() < 2 {
        print_usage(program);
        return Ok(());
    }

    let op = MathOp::from_name(&positional[0]).ok_or_else(|| format!("Unknown math opcode: {}", positional[0]))?;
    let left = parse_reg(&positional[1])?;
    let right = match positional.get(2) {
        Some(text) => Some(parse_reg(text)?),
        None => None,
    };

    let mut machine = Machine::from_config(&config);
    for (kind, cells) in segments {
        let id = machine.heap.allocate_with(kind, cells)?;
        debug!("segment {:04x}: {} ({} cells)", id, kind, cells);
    }

    if op.is_unary() {
        machine.acc = left;
    } else {
        let right = right.ok_or_else(|| format!("{} needs two operands", op.name()))?;
        machine.push(left)?;
        machine.acc = right;
    }

    match machine.execute_math_op(op) {
        Ok(()) => {
            println!("{}", machine.acc);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
