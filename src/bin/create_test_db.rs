use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, Month, OffsetDateTime, macros::time};

use budgetly_rs::{
    AccountId, AccountName, AccountType, Amount, BalanceMode, Category, CategoryName,
    DEFAULT_TIMEZONE, Transaction, TransactionType, UserID, create_account, create_category,
    create_user, get_local_offset, initialize_db, insert_transaction,
};

/// A utility for creating a demo database for budgetly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The number of months of transactions to create, ending with the current month.
    #[arg(long, default_value_t = 12)]
    months: u32,
}

const LEISURE: [&str; 5] = [
    "Cinema com amigos",
    "Jantar em restaurante",
    "Assinatura de streaming",
    "Bar no final de semana",
    "Show local",
];

const PURCHASES: [&str; 5] = [
    "Compra de roupas",
    "Teclado mecânico",
    "Fone de ouvido",
    "Mochila nova",
    "Cadeira de escritório",
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo user...");
    let user = create_user("Diego Viana", "diego@email.com", &conn)?;

    println!("Creating accounts and categories...");
    let checking = create_account(
        AccountName::new("Conta Corrente")?,
        AccountType::Checking,
        user.id,
        &conn,
    )?;
    let credit = create_account(
        AccountName::new("Cartão de Crédito")?,
        AccountType::Credit,
        user.id,
        &conn,
    )?;
    let cash = create_account(AccountName::new("Dinheiro")?, AccountType::Cash, user.id, &conn)?;

    let mut categories = Vec::new();
    for (name, category_type) in [
        ("Salário", TransactionType::Income),
        ("Freelance", TransactionType::Income),
        ("Aluguel", TransactionType::Expense),
        ("Energia Elétrica", TransactionType::Expense),
        ("Internet", TransactionType::Expense),
        ("Alimentação", TransactionType::Expense),
        ("Transporte", TransactionType::Expense),
        ("Lazer", TransactionType::Expense),
        ("Compras", TransactionType::Expense),
        ("Viagem", TransactionType::Expense),
    ] {
        categories.push(create_category(
            CategoryName::new(name)?,
            category_type,
            user.id,
            &conn,
        )?);
    }

    let offset = get_local_offset(DEFAULT_TIMEZONE)?;
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let mut count = 0;

    println!("Creating {} months of transactions...", args.months);
    for months_ago in 0..args.months as i32 {
        let month_index = now.year() * 12 + i32::from(u8::from(now.month())) - 1 - months_ago;
        let year = month_index.div_euclid(12);
        let month = Month::try_from((month_index.rem_euclid(12) + 1) as u8)?;
        // Deterministic variation so that every month looks a little different.
        let wobble = i64::from(month_index.rem_euclid(7));
        let pick = month_index.rem_euclid(5) as usize;

        let mut entries = vec![
            (checking.id, "Salário", Decimal::new(480_000, 2), "Salário mensal", 5),
            (
                cash.id,
                "Freelance",
                Decimal::new(100_000 + wobble * 31_700, 2),
                "Freelance ocasional",
                5,
            ),
            (
                checking.id,
                "Aluguel",
                Decimal::new(120_000, 2),
                "Aluguel do apartamento",
                8,
            ),
            (
                checking.id,
                "Energia Elétrica",
                Decimal::new(12_000 + wobble * 857, 2),
                "Conta de energia elétrica",
                10,
            ),
            (
                checking.id,
                "Internet",
                Decimal::new(11_000, 2),
                "Plano de internet residencial",
                12,
            ),
            (
                checking.id,
                "Alimentação",
                Decimal::new(20_000 + wobble * 2_143, 2),
                "Compras de supermercado",
                15,
            ),
            (
                checking.id,
                "Transporte",
                Decimal::new(8_000 + wobble * 1_000, 2),
                "Combustível",
                18,
            ),
            (
                credit.id,
                "Lazer",
                Decimal::new(6_000 + wobble * 1_714, 2),
                LEISURE[pick],
                22,
            ),
        ];

        if wobble % 2 == 0 {
            entries.push((
                credit.id,
                "Compras",
                Decimal::new(20_000 + wobble * 11_429, 2),
                PURCHASES[pick],
                25,
            ));
        }

        if matches!(month, Month::July | Month::December) {
            entries.push((
                credit.id,
                "Viagem",
                Decimal::new(120_000 + wobble * 22_857, 2),
                "Viagem de lazer",
                20,
            ));
        }

        for (account_id, category, amount, description, day) in entries {
            let date = Date::from_calendar_date(year, month, day)?
                .with_time(time!(12:00))
                .assume_offset(offset);
            insert_demo_transaction(
                account_id,
                find_category(&categories, category)?,
                amount,
                description,
                date,
                user.id,
                &conn,
            )?;
            count += 1;
        }
    }

    println!("Created {count} transactions.");
    println!("Success! Use --user-id {} to act as the demo user.", user.id);

    Ok(())
}

fn find_category<'a>(categories: &'a [Category], name: &str) -> Result<&'a Category, Box<dyn Error>> {
    categories
        .iter()
        .find(|category| category.name.as_ref() == name)
        .ok_or_else(|| format!("missing category {name}").into())
}

fn insert_demo_transaction(
    account_id: AccountId,
    category: &Category,
    amount: Decimal,
    description: &str,
    date: OffsetDateTime,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Box<dyn Error>> {
    insert_transaction(
        &Transaction::build(
            account_id,
            category.id,
            Amount::new(amount)?,
            category.category_type,
            date,
        )
        .description(Some(description)),
        user_id,
        BalanceMode::Stored,
        connection,
    )?;

    Ok(())
}
