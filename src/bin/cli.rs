use clap::{App, AppSettings, Arg, SubCommand};
use std::path::Path;
use vellum::{
    config::FILE_CHUNK_SIZE,
    diagnostics,
    object::FieldInspector,
    storage::max_safe_allocation,
    wire, MappingConfig, OffHeapStorage, RecordStore, Result, Storage, VellumError,
};

fn main() {
    env_logger::init();

    let matches = App::new("vellum-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect and copy vellum storage images")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Emit verbose diagnostics"),
        )
        .subcommand(
            SubCommand::with_name("inspect")
                .about("Print the record store image held in a file")
                .arg(
                    Arg::with_name("file")
                        .short("f")
                        .long("file")
                        .value_name("FILE")
                        .help("File holding the image")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("offset")
                        .short("o")
                        .long("offset")
                        .value_name("OFFSET")
                        .help("Byte offset of the image inside the file")
                        .default_value("0")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("json")
                        .long("json")
                        .help("Print the layout as JSON"),
                ),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Copy a mapped file region into another file")
                .arg(
                    Arg::with_name("file")
                        .short("f")
                        .long("file")
                        .value_name("FILE")
                        .help("File to map")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("out")
                        .long("out")
                        .value_name("OUT")
                        .help("Destination file")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("size")
                        .short("s")
                        .long("size")
                        .value_name("SIZE")
                        .help("Bytes to copy (defaults to the whole file)")
                        .takes_value(true),
                ),
        )
        .subcommand(SubCommand::with_name("info").about("Print limits and registered wire types"))
        .get_matches();

    if matches.is_present("verbose") {
        diagnostics::set_verbose(true);
    }

    let result = match matches.subcommand() {
        ("inspect", Some(sub)) => handle_inspect(sub),
        ("dump", Some(sub)) => handle_dump(sub),
        ("info", Some(_)) => handle_info(),
        _ => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_usize(matches: &clap::ArgMatches, name: &str) -> Result<Option<usize>> {
    matches
        .value_of(name)
        .map(|raw| {
            raw.parse()
                .map_err(|_| VellumError::invalid_parameter(name, format!("Invalid number {:?}", raw)))
        })
        .transpose()
}

fn map_existing(path: &str) -> Result<OffHeapStorage> {
    OffHeapStorage::map(&MappingConfig::file(path, 0).with_create(false))
}

fn handle_inspect(matches: &clap::ArgMatches) -> Result<()> {
    let path = matches.value_of("file").unwrap_or_default();
    let offset = parse_usize(matches, "offset")?.unwrap_or(0);

    let mapped = map_existing(path)?;
    let result = inspect_image(&mapped, offset, matches.is_present("json"));
    mapped.close()?;
    result
}

fn inspect_image(mapped: &OffHeapStorage, offset: usize, json: bool) -> Result<()> {
    if offset >= mapped.size() {
        return Err(VellumError::out_of_bounds(offset, 1, mapped.size()));
    }
    let slice = mapped.slice(offset, mapped.size() - offset)?;
    let mut input = slice.input_stream(false)?;
    let store = RecordStore::read_body(&mut input)?;

    let printed = if json {
        serde_json::to_string_pretty(&store.layout()).map_err(VellumError::from)
    } else {
        let inspector = FieldInspector::new(&store);
        inspector
            .summary()
            .map(|values| format!("{}\nValues:\n{}", store.layout(), values))
    };
    store.close()?;
    println!("{}", printed?);
    Ok(())
}

fn handle_dump(matches: &clap::ArgMatches) -> Result<()> {
    let path = matches.value_of("file").unwrap_or_default();
    let out = matches.value_of("out").unwrap_or_default();

    let mapped = map_existing(path)?;
    let size = parse_usize(matches, "size")?.unwrap_or_else(|| mapped.size());
    let result = mapped.to_file(Path::new(out), 0, size);
    mapped.close()?;
    result?;
    println!("Copied {} bytes from {} to {}", size, path, out);
    Ok(())
}

fn handle_info() -> Result<()> {
    println!("vellum {}", vellum::VERSION);
    println!("  Safe allocation limit: {} bytes", max_safe_allocation());
    println!("  File chunk size: {} bytes", FILE_CHUNK_SIZE);
    println!(
        "  Verbose diagnostics: {}",
        if diagnostics::is_verbose() { "on" } else { "off" }
    );
    println!("\nWire types:");
    for binding in wire::global().bindings() {
        println!(
            "  {:>20} {:<16}{}",
            binding.id(),
            binding.name(),
            if binding.is_builtin() { " (built-in)" } else { "" }
        );
    }
    Ok(())
}
