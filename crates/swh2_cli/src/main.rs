use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde_json::{Map as JsonMap, Value as JsonValue};
use swh2_core::core_api::{CapabilityIssue, Engine, Session};
use swh2_core::strings::StringStorage;
use swh2_core::{ChecksumStatus, DecodeOptions, FieldValue};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldEdit {
    path: String,
    value: FieldValue,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE")]
    path: PathBuf,
    /// Print the well-known values of the save (the default mode).
    #[arg(long, conflicts_with_all = ["check", "get"])]
    list: bool,
    /// Decode, re-encode and report whether the save is safe to edit.
    #[arg(long, conflicts_with = "get")]
    check: bool,
    /// Print one field, e.g. `Head.crew[0]` or `Inve.items[1].name`.
    #[arg(long, value_name = "PATH")]
    get: Option<String>,
    #[arg(long)]
    json: bool,
    #[arg(long)]
    water: Option<u32>,
    #[arg(long)]
    fragments: Option<u32>,
    #[arg(long = "set-int", value_name = "PATH=N", value_parser = parse_int_edit)]
    set_int: Vec<FieldEdit>,
    #[arg(long = "set-str", value_name = "PATH=TEXT", value_parser = parse_str_edit)]
    set_str: Vec<FieldEdit>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Overwrite `--output` if it already exists.
    #[arg(long)]
    force: bool,
    /// Refuse saves whose stored checksum does not match.
    #[arg(long)]
    strict: bool,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn has_edits(&self) -> bool {
        self.water.is_some()
            || self.fragments.is_some()
            || !self.set_int.is_empty()
            || !self.set_str.is_empty()
    }

    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            strict_checksum: self.strict,
            verify_round_trip: false,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let has_edits = cli.has_edits();
    if has_edits && cli.output.is_none() {
        eprintln!("edit flags require --output <PATH>");
        process::exit(2);
    }
    if !has_edits && cli.output.is_some() {
        eprintln!("--output requires at least one edit flag");
        process::exit(2);
    }
    if has_edits && (cli.check || cli.get.is_some()) {
        eprintln!("edit flags cannot be combined with --check or --get");
        process::exit(2);
    }

    let bytes = fs::read(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", cli.path.display());
        process::exit(1);
    });

    let engine = Engine::new();
    let mut session = engine
        .open_bytes(&bytes, cli.decode_options())
        .unwrap_or_else(|e| {
            eprintln!("Error parsing save file: {}", cli.path.display());
            eprintln!("  {e}");
            process::exit(1);
        });

    if cli.check {
        run_check(&session, cli.json);
        return;
    }

    if let Some(path) = &cli.get {
        let value = session.get_field(path).unwrap_or_else(|e| {
            eprintln!("Error reading field {path}: {e}");
            process::exit(1);
        });
        if cli.json {
            let mut out = JsonMap::new();
            out.insert(path.clone(), field_to_json(&value));
            print_json(JsonValue::Object(out));
        } else {
            println!("{path}={value}");
        }
        return;
    }

    if let Some(out_path) = &cli.output {
        if out_path.exists() && !cli.force {
            eprintln!(
                "Refusing to overwrite {} (pass --force to replace it)",
                out_path.display()
            );
            process::exit(1);
        }
        apply_edits(&mut session, &cli);
        let edited_bytes = session.to_bytes_modified().unwrap_or_else(|e| {
            eprintln!("Error creating modified save bytes: {e}");
            process::exit(1);
        });
        fs::write(out_path, edited_bytes).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        });
        if !cli.json {
            println!("Wrote edited save to {}", out_path.display());
            return;
        }
    }

    if cli.json {
        print_json(JsonValue::Object(default_json(&session)));
    } else {
        print_listing(&session);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_edits(session: &mut Session, cli: &Cli) {
    if let Some(water) = cli.water {
        session.set_water(water).unwrap_or_else(|e| {
            eprintln!("Error applying water edit: {e}");
            process::exit(1);
        });
    }
    if let Some(fragments) = cli.fragments {
        session.set_fragments(fragments).unwrap_or_else(|e| {
            eprintln!("Error applying fragments edit: {e}");
            process::exit(1);
        });
    }
    for edit in cli.set_int.iter().chain(&cli.set_str) {
        session
            .set_field(&edit.path, edit.value.clone())
            .unwrap_or_else(|e| {
                eprintln!("Error applying edit to {}: {e}", edit.path);
                process::exit(1);
            });
    }
}

fn run_check(session: &Session, json: bool) {
    let issues = &session.capabilities().issues;
    let round_trip_ok = !issues.contains(&CapabilityIssue::RoundTripMismatch);
    let structure_complete = !issues.contains(&CapabilityIssue::PartialStructure);
    let snapshot = session.snapshot();

    if json {
        let mut out = JsonMap::new();
        out.insert(
            "checksum".to_string(),
            JsonValue::String(checksum_label(snapshot.checksum).to_string()),
        );
        out.insert("round_trip".to_string(), JsonValue::Bool(round_trip_ok));
        out.insert(
            "complete_structure".to_string(),
            JsonValue::Bool(structure_complete),
        );
        out.insert(
            "editable".to_string(),
            JsonValue::Bool(session.capabilities().can_apply_edits),
        );
        print_json(JsonValue::Object(out));
    } else {
        println!("checksum={}", checksum_label(snapshot.checksum));
        if let ChecksumStatus::Mismatch { stored, computed } = snapshot.checksum {
            println!("checksum_stored={stored:#010x}");
            println!("checksum_computed={computed:#010x}");
        }
        println!("round_trip={}", if round_trip_ok { "ok" } else { "mismatch" });
        println!(
            "structure={}",
            if structure_complete { "complete" } else { "partial" }
        );
    }

    if !issues.is_empty() {
        process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

fn default_json(session: &Session) -> JsonMap<String, JsonValue> {
    let snapshot = session.snapshot();
    let mut out = JsonMap::new();

    out.insert("version".to_string(), JsonValue::from(snapshot.version));
    out.insert(
        "checksum".to_string(),
        JsonValue::String(checksum_label(snapshot.checksum).to_string()),
    );
    out.insert(
        "location".to_string(),
        JsonValue::String(snapshot.location.clone()),
    );
    out.insert(
        "region".to_string(),
        JsonValue::String(snapshot.region.clone()),
    );
    out.insert("quest".to_string(), JsonValue::String(snapshot.quest.clone()));
    out.insert("crew".to_string(), strings_to_json(&snapshot.crew));
    out.insert(
        "outset".to_string(),
        JsonValue::String(snapshot.outset.clone()),
    );
    out.insert(
        "campaign_state".to_string(),
        JsonValue::String(snapshot.campaign_state.clone()),
    );
    out.insert(
        "water".to_string(),
        snapshot.water.map_or(JsonValue::Null, JsonValue::from),
    );
    out.insert(
        "fragments".to_string(),
        snapshot.fragments.map_or(JsonValue::Null, JsonValue::from),
    );
    out.insert("equipped".to_string(), strings_to_json(&snapshot.equipped));
    out.insert("upgrades".to_string(), strings_to_json(&snapshot.upgrades));
    out.insert("inventory".to_string(), strings_to_json(&snapshot.inventory));
    out.insert("hats".to_string(), strings_to_json(&snapshot.hats));
    out.insert("new_hats".to_string(), strings_to_json(&snapshot.new_hats));
    out.insert(
        "leeway_hat".to_string(),
        JsonValue::String(snapshot.leeway_hat.clone()),
    );
    out.insert(
        "string_storage".to_string(),
        JsonValue::String(storage_label(snapshot.string_storage).to_string()),
    );
    out.insert(
        "skippable_section".to_string(),
        JsonValue::Bool(snapshot.skippable_section),
    );
    out.insert(
        "unmodeled_chunks".to_string(),
        strings_to_json(&snapshot.unmodeled_chunks),
    );
    out.insert(
        "editable".to_string(),
        JsonValue::Bool(session.capabilities().can_apply_edits),
    );

    out
}

fn strings_to_json(values: &[String]) -> JsonValue {
    JsonValue::Array(values.iter().cloned().map(JsonValue::String).collect())
}

fn field_to_json(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Int(v) => JsonValue::from(*v),
        FieldValue::Str(_) => JsonValue::String(value.to_text().unwrap_or_default()),
        FieldValue::Bytes(bytes) => JsonValue::String(hex(bytes)),
    }
}

fn print_json(value: JsonValue) {
    let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_listing(session: &Session) {
    let snapshot = session.snapshot();

    println!("SteamWorld Heist II save (version {})", snapshot.version);
    println!("  Checksum:        {}", checksum_label(snapshot.checksum));
    println!(
        "  String storage:  {}",
        storage_label(snapshot.string_storage)
    );
    if !session.capabilities().can_apply_edits {
        println!("  Editing:         disabled (save does not round-trip)");
    }
    println!();

    println!("  Location:        {}", snapshot.location);
    println!("  Region:          {}", snapshot.region);
    println!("  Quest:           {}", snapshot.quest);
    println!("  Outset:          {}", snapshot.outset);
    println!("  Campaign state:  {}", snapshot.campaign_state);
    println!("  Water:           {}", format_optional(snapshot.water));
    println!("  Fragments:       {}", format_optional(snapshot.fragments));
    println!();

    print_list("Crew", &snapshot.crew);
    print_list("Equipped", &snapshot.equipped);
    print_list("Upgrades", &snapshot.upgrades);
    print_list("Inventory", &snapshot.inventory);
    print_list("Hats", &snapshot.hats);
    print_list("New hats", &snapshot.new_hats);
    println!("  Leeway hat:      {}", snapshot.leeway_hat);

    if !snapshot.unmodeled_chunks.is_empty() {
        println!();
        println!(
            "  Unmodeled data:  {}",
            snapshot.unmodeled_chunks.join(", ")
        );
    }
}

fn print_list(label: &str, items: &[String]) {
    println!("  {label} ({}):", items.len());
    for item in items {
        println!("    {item}");
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn parse_int_edit(value: &str) -> Result<FieldEdit, String> {
    let (path, raw) = split_edit(value)?;
    let parsed = raw
        .parse::<u64>()
        .map_err(|_| format!("invalid integer '{raw}' (expected PATH=N)"))?;
    Ok(FieldEdit {
        path,
        value: FieldValue::Int(parsed),
    })
}

fn parse_str_edit(value: &str) -> Result<FieldEdit, String> {
    let (path, text) = split_edit(value)?;
    if !text.chars().all(|c| u32::from(c) <= 0xFF) {
        return Err(format!("'{text}' has characters outside Latin-1"));
    }
    Ok(FieldEdit {
        path,
        value: FieldValue::text(text),
    })
}

fn split_edit(value: &str) -> Result<(String, &str), String> {
    match value.split_once('=') {
        Some((path, rest)) if !path.is_empty() => Ok((path.to_string(), rest)),
        _ => Err(format!("invalid edit '{value}' (expected PATH=VALUE)")),
    }
}

fn checksum_label(status: ChecksumStatus) -> &'static str {
    match status {
        ChecksumStatus::Valid => "valid",
        ChecksumStatus::Mismatch { .. } => "mismatch",
    }
}

fn storage_label(storage: StringStorage) -> &'static str {
    match storage {
        StringStorage::Compressed => "compressed",
        StringStorage::Expanded => "expanded",
        StringStorage::Unknown => "unknown",
    }
}

fn format_optional(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
