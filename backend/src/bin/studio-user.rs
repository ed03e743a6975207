use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use common::auth::{hash_password, User};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args[1] != "add-user" {
        eprintln!("Usage: {} add-user <users_file>", args[0]);
        eprintln!("       (Credentials are read from stdin/prompt)");
        std::process::exit(1);
    }

    let users_file_path = &args[2];

    print!("Enter username: ");
    io::stdout().flush().unwrap();
    let mut username = String::new();
    io::stdin().read_line(&mut username).unwrap();
    let username = username.trim().to_string();

    print!("Enter password: ");
    io::stdout().flush().unwrap();
    let mut password = String::new();
    io::stdin().read_line(&mut password).unwrap();
    let password = password.trim();

    let (hash, salt) = hash_password(password);
    let new_user = User {
        username: username.clone(),
        password_hash: hash,
        salt,
    };

    let mut users: Vec<User> = Vec::new();
    if Path::new(users_file_path).exists() {
        let content = fs::read_to_string(users_file_path).unwrap_or_default();
        if !content.is_empty() {
            users = serde_json::from_str(&content).expect("users file is not valid JSON");
            if users.iter().any(|u| u.username == username) {
                eprintln!("User {} already exists. Updating password.", username);
                users.retain(|u| u.username != username);
            }
        }
    }

    users.push(new_user);

    let json = serde_json::to_string_pretty(&users).expect("failed to serialize users");
    fs::write(users_file_path, json).expect("failed to write users file");

    println!("User {} added/updated successfully in {}", username, users_file_path);
}
