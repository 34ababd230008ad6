use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rebind_ids::{HASH_VERSION, UniqueId};
use rebind_store::PersistenceDb;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = match command {
        "inspect" => inspect_command(&args, &cwd),
        "verify" => verify_command(&args, &cwd),
        _ => {
            print_usage();
            Err(format!("unknown command `{command}`"))
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  rebind_cli inspect [--data <dir>] [--scene <name>]");
    eprintln!("  rebind_cli verify  [--data <dir>]");
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

fn data_dir(args: &[String], cwd: &Path) -> PathBuf {
    parse_flag_value(args, "--data")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn inspect_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let dir = data_dir(args, cwd);
    let db = PersistenceDb::open(&dir);
    let scene_filter = parse_flag_value(args, "--scene");

    println!("data dir: {}", dir.display());
    println!(
        "transform records: {} across {} scene(s)",
        db.transforms.total_len(),
        db.transforms.scene_names().count()
    );
    println!(
        "baked identities:  {} across {} scene(s)",
        db.baked.total_len(),
        db.baked.scene_names().count()
    );

    let scenes: Vec<String> = db.transforms.scene_names().map(str::to_string).collect();
    for scene in scenes {
        if let Some(filter) = &scene_filter
            && filter != &scene
        {
            continue;
        }
        let Some(records) = db.transforms.scene(&scene) else {
            continue;
        };
        println!("\n[{scene}] {} record(s)", records.len());
        for (id, rec) in records {
            let mut flags = String::new();
            if rec.is_destroyed {
                flags.push('D');
            }
            if rec.is_spawned {
                flags.push('S');
            }
            println!(
                "  {id:<40} {:<3} {} @ ({:.2}, {:.2}, {:.2})",
                flags, rec.object_path, rec.position.x, rec.position.y, rec.position.z
            );
        }
    }
    Ok(())
}

fn verify_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let dir = data_dir(args, cwd);
    let mut problems = 0usize;

    problems += verify_file(&dir.join(PersistenceDb::TRANSFORMS_FILE));
    problems += verify_file(&dir.join(PersistenceDb::BAKED_FILE));
    problems += verify_records(&dir);

    if problems == 0 {
        println!("ok");
        Ok(())
    } else {
        Err(format!("{problems} problem(s) found"))
    }
}

/// Raw structural checks on one store file. The library loader tolerates all
/// of these silently; the operator wants them reported.
fn verify_file(path: &Path) -> usize {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            println!("{}: missing (treated as empty by the loader)", path.display());
            return 0;
        }
    };
    if contents.trim().is_empty() {
        println!("{}: empty (treated as empty by the loader)", path.display());
        return 0;
    }

    let value: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(err) => {
            println!("{}: malformed JSON: {err}", path.display());
            return 1;
        }
    };

    let mut problems = 0;
    match value.get("hash_version").and_then(|v| v.as_u64()) {
        Some(v) if v == u64::from(HASH_VERSION) => {}
        Some(v) => {
            println!(
                "{}: hash_version {v} does not match current {HASH_VERSION}; \
                 ids will fall back to path matching",
                path.display()
            );
            problems += 1;
        }
        None => {
            println!("{}: missing hash_version field", path.display());
            problems += 1;
        }
    }
    problems
}

/// Per-record consistency: map keys agree with the embedded fields, and
/// structural ids decompose into the stored PathID/ItemID.
fn verify_records(dir: &Path) -> usize {
    let db = PersistenceDb::open(dir);
    let mut problems = 0;

    let scenes: Vec<String> = db.transforms.scene_names().map(str::to_string).collect();
    for scene in scenes {
        let Some(records) = db.transforms.scene(&scene) else {
            continue;
        };
        for (key, rec) in records {
            if key != &rec.unique_id {
                println!("[{scene}] key `{key}` != record unique_id `{}`", rec.unique_id);
                problems += 1;
            }
            if !rec.scene_name.is_empty() && rec.scene_name != scene {
                println!(
                    "[{scene}] {key}: record claims scene `{}`",
                    rec.scene_name
                );
                problems += 1;
            }
            if let UniqueId::Structural { path_id, item_id } = UniqueId::parse(&rec.unique_id) {
                if !rec.path_id.is_empty() && rec.path_id != path_id {
                    println!("[{scene}] {key}: path_id field `{}` != id part", rec.path_id);
                    problems += 1;
                }
                if !rec.item_id.is_empty() && rec.item_id != item_id {
                    println!("[{scene}] {key}: item_id field `{}` != id part", rec.item_id);
                    problems += 1;
                }
            }
        }
    }
    problems
}
