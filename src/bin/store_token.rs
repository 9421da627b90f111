use std::path::Path;

use trip_sessions::adapters::credentials::{
    AUTH_TOKEN_KEY, CredentialStore, DEFAULT_DB_PATH, SqliteCredentialStore,
};

fn main() {
    if let Err(error) = run() {
        eprintln!("store_token failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    // Same lookup as the screen: `.env` first, then the process environment.
    let mut path = store_path_from(|key| dotenvy::var(key).ok());
    let mut token: Option<String> = None;
    let mut clear = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--path" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--path requires a value".to_string());
                };
                path = value.clone();
                index += 2;
            }
            "--token" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--token requires a value".to_string());
                };
                token = Some(value.clone());
                index += 2;
            }
            "--clear" => {
                clear = true;
                index += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    if clear == token.is_some() {
        return Err("pass exactly one of --token <value> or --clear".to_string());
    }

    let path_ref = Path::new(&path);
    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    let store = SqliteCredentialStore::initialize(path.as_str()).map_err(|error| error.to_string())?;

    match token {
        Some(token) => {
            store
                .write(AUTH_TOKEN_KEY, &token)
                .map_err(|error| error.to_string())?;
            println!("stored {AUTH_TOKEN_KEY} in: {}", store.path());
        }
        None => {
            let removed = store
                .remove(AUTH_TOKEN_KEY)
                .map_err(|error| error.to_string())?;
            if removed {
                println!("cleared {AUTH_TOKEN_KEY} in: {}", store.path());
            } else {
                println!("no {AUTH_TOKEN_KEY} stored in: {}", store.path());
            }
        }
    }

    Ok(())
}

fn store_path_from<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("CREDENTIALS_DB_PATH")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}

fn print_help() {
    println!("store_token");
    println!();
    println!("Usage:");
    println!("  cargo run --bin store_token -- (--token <value> | --clear) [--path <file>]");
    println!();
    println!("Options:");
    println!("  --token <value>  persist the auth token sent as x-access-tokens");
    println!("  --clear          remove the stored auth token");
    println!(
        "  --path <file>    credential store (default: $CREDENTIALS_DB_PATH or {DEFAULT_DB_PATH})"
    );
}

#[cfg(test)]
mod tests {
    use trip_sessions::adapters::credentials::DEFAULT_DB_PATH;

    use super::store_path_from;

    #[test]
    fn falls_back_to_shared_default_path() {
        assert_eq!(store_path_from(|_| None), DEFAULT_DB_PATH);
        assert_eq!(store_path_from(|_| Some("  ".to_string())), DEFAULT_DB_PATH);
    }

    #[test]
    fn uses_configured_path() {
        let path = store_path_from(|key| match key {
            "CREDENTIALS_DB_PATH" => Some(" /tmp/creds.db ".to_string()),
            _ => None,
        });

        assert_eq!(path, "/tmp/creds.db");
    }
}
