use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use congregate_datasets::TableKind;

#[derive(Debug, Parser)]
#[command(name = "congregate", about = "Browse events and register members from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List events open to the signed-in user
    Events(SessionArgs),
    /// Register a new member or worker
    Register(RegisterArgs),
    /// Resolve reference codes to labels
    Lookup {
        #[arg(value_enum)]
        table: Table,
        /// Codes to resolve, in display order. Lists the whole table when empty
        codes: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[arg(long, env = "CONGREGATE_ACCESS_TOKEN")]
    pub access_token: String,
    #[arg(long, env = "CONGREGATE_REFRESH_TOKEN")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub place_of_birth: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date_of_birth: NaiveDate,
    #[arg(long)]
    pub password: String,

    /// Register as a worker; requires the worker fields below
    #[arg(long)]
    pub worker: bool,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub marital_status: Option<String>,
    #[arg(long)]
    pub department: Option<String>,
    #[arg(long)]
    pub cool: Option<i64>,
    #[arg(long)]
    pub campus: Option<String>,
    #[arg(long)]
    pub kkj: Option<String>,
    #[arg(long)]
    pub kom: bool,
    #[arg(long)]
    pub baptized: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Table {
    Campus,
    Department,
    Cool,
    Category,
}

impl From<Table> for TableKind {
    fn from(table: Table) -> Self {
        match table {
            Table::Campus => TableKind::Campus,
            Table::Department => TableKind::Department,
            Table::Cool => TableKind::Cool,
            Table::Category => TableKind::Category,
        }
    }
}
