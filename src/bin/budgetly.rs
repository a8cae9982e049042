use std::{path::PathBuf, process::exit};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use budgetly_rs::{
    AccountName, AccountType, Amount, BalanceMode, CategoryName, DEFAULT_TIMEZONE, Error,
    LedgerConfig, SortField, SortOrder, Transaction, TransactionFilter, TransactionSort,
    TransactionType, TransactionUpdate, UserID, count_users, create_account, create_category,
    create_user, delete_transaction, get_account, get_account_balance, get_balance_by_category,
    get_category_summary, get_financial_summary, get_monthly_balance, get_transaction,
    get_user_by_id, insert_transaction, list_accounts, list_categories, list_financial_overview,
    list_recent_transactions, list_transactions, rebuild_stored_balances, update_transaction,
};

/// Keep track of accounts, categories and transactions from the command line.
///
/// Results are printed to stdout as JSON.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, global = true, default_value = "budgetly.db")]
    db_path: PathBuf,

    /// Whether account balances are summed from the ledger on every read
    /// ("derived") or kept as a running total ("stored").
    #[arg(long, global = true, default_value = "derived")]
    balance_mode: BalanceMode,

    /// The canonical timezone used for calendar months, e.g. "America/Sao_Paulo".
    #[arg(long, global = true, default_value = DEFAULT_TIMEZONE)]
    timezone: String,

    /// The ID of the user to act as.
    #[arg(long, short, global = true)]
    user_id: Option<i64>,

    /// Log debug messages to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database tables.
    Init,
    /// Create a user.
    AddUser {
        /// The user's display name.
        #[arg(long)]
        name: String,
        /// The user's email address.
        #[arg(long)]
        email: String,
    },
    /// Create an account.
    AddAccount {
        /// The account name, e.g. "Conta Corrente".
        #[arg(long)]
        name: String,
        /// One of CHECKING, CREDIT or CASH.
        #[arg(long = "type")]
        account_type: AccountType,
    },
    /// Create a category.
    AddCategory {
        /// The category name, e.g. "Salário".
        #[arg(long)]
        name: String,
        /// One of INCOME or EXPENSE.
        #[arg(long = "type")]
        category_type: TransactionType,
    },
    /// Record a transaction.
    AddTransaction {
        #[arg(long)]
        account_id: i64,
        #[arg(long)]
        category_id: i64,
        /// A positive amount, rounded to cents.
        #[arg(long)]
        amount: Decimal,
        /// One of INCOME or EXPENSE, must match the category.
        #[arg(long = "type")]
        transaction_type: TransactionType,
        /// An RFC 3339 date-time, defaults to now.
        #[arg(long, value_parser = parse_date_time)]
        date: Option<OffsetDateTime>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change the amount, description or date of a transaction.
    EditTransaction {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        amount: Option<Decimal>,
        /// The new description, pass an empty string to clear it.
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_date_time)]
        date: Option<OffsetDateTime>,
    },
    /// Delete a transaction.
    DeleteTransaction {
        #[arg(long)]
        id: i64,
    },
    /// List accounts with their balances.
    Accounts {
        #[command(flatten)]
        page: PageArgs,
    },
    /// List the account types.
    AccountTypes,
    /// List categories.
    Categories,
    /// List the category and transaction types.
    CategoryTypes,
    /// List transactions.
    Transactions {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List the most recent transactions.
    Recent {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Sum the ledger of one account.
    Balance {
        #[arg(long)]
        account_id: i64,
    },
    /// Income minus expenses for one calendar month.
    MonthlyBalance {
        #[arg(long)]
        year: i32,
        /// 1-12.
        #[arg(long)]
        month: u8,
        #[arg(long)]
        account_id: Option<i64>,
    },
    /// Totals per category over the last few days.
    CategorySummary {
        /// The number of days to cover, defaults to 30.
        #[arg(long)]
        days: Option<u32>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Unsigned totals per category.
    BalanceByCategory {
        #[arg(long, value_parser = parse_date_time)]
        start_date: Option<OffsetDateTime>,
        #[arg(long, value_parser = parse_date_time)]
        end_date: Option<OffsetDateTime>,
        #[arg(long)]
        account_id: Option<i64>,
    },
    /// The all-time balance and this month's income and expenses.
    Summary,
    /// Transactions grouped by account and category.
    Overview {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Recompute stored balances from the ledger.
    RebuildBalances,
}

#[derive(clap::Args, Debug)]
struct PageArgs {
    /// The page to show, starting from 1.
    #[arg(long)]
    page: Option<u64>,
    /// The number of items per page, at most 100.
    #[arg(long)]
    limit: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct FilterArgs {
    #[arg(long)]
    account_id: Option<i64>,
    #[arg(long)]
    category_id: Option<i64>,
    #[arg(long = "type")]
    transaction_type: Option<TransactionType>,
    #[arg(long, value_parser = parse_date_time)]
    start_date: Option<OffsetDateTime>,
    #[arg(long, value_parser = parse_date_time)]
    end_date: Option<OffsetDateTime>,
    #[arg(long)]
    min_amount: Option<Decimal>,
    #[arg(long)]
    max_amount: Option<Decimal>,
    /// Text to look for in descriptions, ignoring case.
    #[arg(long)]
    search: Option<String>,
}

impl FilterArgs {
    fn into_filter(self, user_id: UserID) -> TransactionFilter {
        TransactionFilter {
            user_id,
            account_id: self.account_id,
            category_id: self.category_id,
            transaction_type: self.transaction_type,
            start_date: self.start_date,
            end_date: self.end_date,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            search: self.search,
        }
    }
}

#[derive(clap::Args, Debug)]
struct SortArgs {
    #[arg(long, value_enum, default_value_t = OrderBy::Date)]
    order_by: OrderBy,
    #[arg(long, value_enum, default_value_t = Order::Desc)]
    order: Order,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderBy {
    Date,
    Amount,
    CreatedAt,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Order {
    Asc,
    Desc,
}

impl From<SortArgs> for TransactionSort {
    fn from(args: SortArgs) -> Self {
        let field = match args.order_by {
            OrderBy::Date => SortField::Date,
            OrderBy::Amount => SortField::Amount,
            OrderBy::CreatedAt => SortField::CreatedAt,
        };
        let order = match args.order {
            Order::Asc => SortOrder::Ascending,
            Order::Desc => SortOrder::Descending,
        };

        TransactionSort { field, order }
    }
}

#[derive(Serialize)]
struct TypeLabel {
    value: String,
    label: &'static str,
}

fn main() {
    let args = Args::parse();

    setup_logging(args.verbose);

    if let Err(error) = run(args) {
        print_error(error.public_message());
        exit(if error.is_client_error() { 1 } else { 2 });
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_log).init();
}

fn run(args: Args) -> Result<(), Error> {
    let config = LedgerConfig {
        balance_mode: args.balance_mode,
        local_timezone: args.timezone,
        ..LedgerConfig::default()
    };
    let mode = config.balance_mode;

    let connection = Connection::open(&args.db_path)?;
    config.prepare_database(&connection)?;
    tracing::debug!("opened {:?} with {mode} balances", args.db_path);

    let pagination = &config.pagination;
    let user_id = args.user_id;
    let current_user = || require_user(user_id, &connection);

    match args.command {
        Command::Init => print_json(&serde_json::json!({ "users": count_users(&connection)? })),
        Command::AddUser { name, email } => print_json(&create_user(&name, &email, &connection)?),
        Command::AddAccount { name, account_type } => {
            let account = create_account(
                AccountName::new(&name)?,
                account_type,
                current_user()?,
                &connection,
            )?;
            print_json(&account)
        }
        Command::AddCategory {
            name,
            category_type,
        } => {
            let category = create_category(
                CategoryName::new(&name)?,
                category_type,
                current_user()?,
                &connection,
            )?;
            print_json(&category)
        }
        Command::AddTransaction {
            account_id,
            category_id,
            amount,
            transaction_type,
            date,
            description,
        } => {
            let new_transaction = Transaction::build(
                account_id,
                category_id,
                Amount::new(amount)?,
                transaction_type,
                date.unwrap_or_else(OffsetDateTime::now_utc),
            )
            .description(description.as_deref());
            print_json(&insert_transaction(
                &new_transaction,
                current_user()?,
                mode,
                &connection,
            )?)
        }
        Command::EditTransaction {
            id,
            amount,
            description,
            date,
        } => {
            let user_id = current_user()?;
            let existing =
                get_transaction(id, user_id, &connection).map_err(|error| match error {
                    Error::NotFound => Error::UpdateMissingTransaction,
                    error => error,
                })?;
            let update = merge_edit(&existing, amount, description, date)?;
            print_json(&update_transaction(id, &update, user_id, mode, &connection)?)
        }
        Command::DeleteTransaction { id } => {
            print_json(&delete_transaction(id, current_user()?, mode, &connection)?)
        }
        Command::Accounts { page } => {
            let page = pagination.request(page.page, page.limit, pagination.accounts_page_size);
            print_json(&list_accounts(current_user()?, mode, page, &connection)?)
        }
        Command::AccountTypes => print_json(
            &AccountType::all()
                .iter()
                .map(|account_type| TypeLabel {
                    value: account_type.to_string(),
                    label: account_type.label(),
                })
                .collect::<Vec<_>>(),
        ),
        Command::Categories => print_json(&list_categories(current_user()?, &connection)?),
        Command::CategoryTypes => print_json(
            &TransactionType::all()
                .iter()
                .map(|transaction_type| TypeLabel {
                    value: transaction_type.to_string(),
                    label: transaction_type.label(),
                })
                .collect::<Vec<_>>(),
        ),
        Command::Transactions { filter, sort, page } => {
            let filter = filter.into_filter(current_user()?);
            let page = pagination.request(page.page, page.limit, pagination.transactions_page_size);
            print_json(&list_transactions(&filter, sort.into(), page, &connection)?)
        }
        Command::Recent { page } => {
            let page = pagination.request(
                page.page,
                page.limit,
                pagination.recent_transactions_page_size,
            );
            print_json(&list_recent_transactions(current_user()?, page, &connection)?)
        }
        Command::Balance { account_id } => {
            let account = get_account(account_id, current_user()?, mode, &connection)?;
            let ledger_balance = get_account_balance(account.id, &connection)?;
            if account.balance != ledger_balance {
                tracing::warn!(
                    "{mode} balance {} of account {} differs from its ledger sum {ledger_balance}",
                    account.balance,
                    account.id
                );
            }
            print_json(&serde_json::json!({
                "account_id": account.id,
                "balance_mode": mode,
                "balance": account.balance,
            }))
        }
        Command::MonthlyBalance {
            year,
            month,
            account_id,
        } => print_json(&get_monthly_balance(
            current_user()?,
            year,
            month,
            account_id,
            config.local_offset()?,
            &connection,
        )?),
        Command::CategorySummary { days, page } => {
            let page = pagination.request(
                page.page,
                page.limit,
                pagination.category_summary_page_size,
            );
            print_json(&get_category_summary(
                current_user()?,
                days.unwrap_or(config.category_window_days),
                OffsetDateTime::now_utc(),
                page,
                &connection,
            )?)
        }
        Command::BalanceByCategory {
            start_date,
            end_date,
            account_id,
        } => print_json(&get_balance_by_category(
            current_user()?,
            start_date,
            end_date,
            account_id,
            &connection,
        )?),
        Command::Summary => print_json(&get_financial_summary(
            current_user()?,
            OffsetDateTime::now_utc(),
            config.local_offset()?,
            &connection,
        )?),
        Command::Overview { filter, sort, page } => {
            let filter = filter.into_filter(current_user()?);
            let page = pagination.request(page.page, page.limit, pagination.overview_page_size);
            print_json(&list_financial_overview(
                &filter,
                sort.into(),
                page,
                mode,
                &connection,
            )?)
        }
        Command::RebuildBalances => print_json(
            &serde_json::json!({ "accounts_updated": rebuild_stored_balances(&connection)? }),
        ),
    }
}

/// Apply the fields given to `edit-transaction` over an existing
/// transaction.
///
/// Omitted fields keep their current value. An empty or blank description
/// clears the description.
fn merge_edit(
    existing: &Transaction,
    amount: Option<Decimal>,
    description: Option<String>,
    date: Option<OffsetDateTime>,
) -> Result<TransactionUpdate, Error> {
    let amount = match amount {
        Some(amount) => Amount::new(amount)?,
        None => existing.amount,
    };
    let description = description.or_else(|| existing.description.clone());

    Ok(TransactionUpdate::new(
        amount,
        description.as_deref(),
        date.unwrap_or(existing.date),
    ))
}

/// Resolve `--user-id` to a user in the database, exiting with a usage
/// error if it was not given.
fn require_user(user_id: Option<i64>, connection: &Connection) -> Result<UserID, Error> {
    let Some(user_id) = user_id else {
        Args::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "this command needs --user-id <USER_ID>",
            )
            .exit();
    };

    let user = get_user_by_id(UserID::new(user_id), connection)?;

    Ok(user.id)
}

fn print_json(value: &impl Serialize) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn parse_date_time(text: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|error| {
        format!("expected an RFC 3339 date-time like 2025-10-05T12:00:00-03:00: {error}")
    })
}

fn print_error(message: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", message.to_string())
}
