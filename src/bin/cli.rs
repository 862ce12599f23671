use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::fs;

const TOKEN_FILE: &str = ".obras_token";

#[derive(Parser)]
#[command(name = "obras-cli")]
#[command(about = "CLI for the obras_hub REST API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:11111")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Show the claims of the saved session
    Whoami,
    /// Exchange the saved token for one with a fresh 24h window
    Refresh,
    Projects {
        #[arg(short, long)]
        query: Option<String>,
        /// `all` or a status such as IN_PROGRESS
        #[arg(short, long)]
        status: Option<String>,
    },
    Works {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Works grouped by status
    Board {
        #[arg(short, long)]
        query: Option<String>,
    },
    Summary,
    CreateProject {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// YYYY-MM-DD
        #[arg(short = 's', long)]
        start_date: String,
        #[arg(short = 'e', long)]
        end_date: Option<String>,
        #[arg(short, long)]
        budget: Option<f64>,
        #[arg(short, long)]
        manager: String,
    },
    CreateWork {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        location: String,
        #[arg(short = 'P', long)]
        project_id: u64,
        #[arg(short, long)]
        assignee: String,
        #[arg(short = 'c', long)]
        planned_cost: Option<f64>,
        #[arg(short = 's', long)]
        start_date: Option<String>,
        #[arg(short = 'e', long)]
        end_date: Option<String>,
    },
    Logout,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_at: i64,
    name: String,
}

fn authorized(request: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    request.header("Authorization", format!("Bearer {}", token.trim()))
}

fn list_params(query: Option<String>, status: Option<String>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(q) = query {
        params.push(("q", q));
    }
    if let Some(status) = status {
        params.push(("status", status));
    }
    params
}

async fn save_session(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if res.status().is_success() {
        let body: LoginResponse = res.json().await?;
        fs::write(TOKEN_FILE, body.token)?;
        println!(
            "Logged in as {}. Token saved to {} (expires at {})",
            body.name, TOKEN_FILE, body.expires_at
        );
    } else {
        println!("Login failed: {}", res.text().await?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    let request = match cli.command {
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/login", cli.url))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;
            return save_session(res).await;
        }
        Commands::Refresh => {
            let res = authorized(client.post(format!("{}/session/refresh", cli.url)))
                .send()
                .await?;
            return save_session(res).await;
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
            return Ok(());
        }
        Commands::Whoami => authorized(client.get(format!("{}/session", cli.url))),
        Commands::Projects { query, status } => {
            authorized(client.get(format!("{}/projects", cli.url))).query(&list_params(query, status))
        }
        Commands::Works { query, status } => {
            authorized(client.get(format!("{}/works", cli.url))).query(&list_params(query, status))
        }
        Commands::Board { query } => {
            authorized(client.get(format!("{}/works/board", cli.url))).query(&list_params(query, None))
        }
        Commands::Summary => authorized(client.get(format!("{}/projects/summary", cli.url))),
        Commands::CreateProject { name, description, start_date, end_date, budget, manager } => {
            authorized(client.post(format!("{}/projects", cli.url))).json(&json!({
                "name": name,
                "description": description,
                "startDate": start_date,
                "endDate": end_date,
                "budget": budget,
                "manager": manager
            }))
        }
        Commands::CreateWork {
            name,
            description,
            location,
            project_id,
            assignee,
            planned_cost,
            start_date,
            end_date,
        } => authorized(client.post(format!("{}/works", cli.url))).json(&json!({
            "name": name,
            "description": description,
            "location": location,
            "projectId": project_id,
            "assignee": assignee,
            "plannedCost": planned_cost,
            "startDate": start_date,
            "endDate": end_date
        })),
    };

    let res = request.send().await?;
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => println!("{} {}", status, serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{} {}", status, text),
    }

    Ok(())
}
