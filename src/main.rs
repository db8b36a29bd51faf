use std::{path::PathBuf, process::ExitCode};

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use library_lending::{
    Book, BookCategory, Clock, FineNotifier, FixedClock, Identity, Isbn, JsonStore, Ledger,
    LendingError, LibraryConfig, LoanLogger, Member, MemberClass, MemberId, Render, SystemClock,
    load_ledger, save_ledger,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Command-line front end for the library lending ledger
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding books.json, members.json and loans.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,

    /// Action to perform
    #[command(subcommand)]
    command: Command,
}

/// One library desk action
#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new title to the catalog
    AddBook {
        /// ISBN of the title
        isbn: String,
        /// Title
        title: String,
        /// Author
        author: String,
        /// Fiction, science-and-technology, history or biography
        #[arg(long)]
        category: BookCategory,
        /// Number of copies owned
        #[arg(long, default_value_t = 1)]
        copies: u32,
        /// Replacement price
        #[arg(long, default_value_t = Decimal::ZERO)]
        price: Decimal,
        /// Publication date (yyyy-mm-dd)
        #[arg(long)]
        published: NaiveDate,
    },
    /// Register a new member
    RegisterMember {
        /// Library card number
        id: String,
        /// Full name
        name: String,
        /// Student, faculty or general-public
        #[arg(long)]
        class: MemberClass,
        /// Contact email
        #[arg(long, default_value = "")]
        email: String,
        /// Contact phone
        #[arg(long, default_value = "")]
        phone: String,
    },
    /// Lend a copy to a member
    Issue {
        /// Library card number
        member: String,
        /// ISBN of the title
        isbn: String,
    },
    /// Take a copy back from a member
    Return {
        /// Library card number
        member: String,
        /// ISBN of the title
        isbn: String,
    },
    /// Search titles, authors, ISBNs and categories
    Search {
        /// Text to look for
        term: String,
    },
    /// List the whole catalog
    Books,
    /// List every member
    Members,
    /// Show a member's loans
    History {
        /// Library card number
        member: String,
    },
    /// List overdue loans with the fines accrued so far
    Overdue,
}

/// Whether a command changed state that needs saving
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// State was mutated
    Changed,
    /// Read-only command
    Unchanged,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = LibraryConfig::load().unwrap_or_else(|err| {
        eprintln!("{} {err}", "Ignoring unreadable configuration:".yellow());
        LibraryConfig::default()
    });
    init_tracing(&config.log_filter);
    if let Some(dir) = args.data_dir.clone() {
        config.data_dir = dir;
    }

    let store = JsonStore::new(&config.data_dir);
    match args.as_of {
        Some(instant) => run(&args.command, &store, FixedClock::new(instant)),
        None => run(&args.command, &store, SystemClock),
    }
}

/// Install the stderr `tracing` subscriber, preferring `RUST_LOG` over the configured filter
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Load, execute one command, save if needed
fn run<C: Clock>(command: &Command, store: &JsonStore, clock: C) -> ExitCode {
    let mut ledger = load_ledger(store, clock);
    ledger.register_observer(Box::new(LoanLogger));
    ledger.register_observer(Box::new(FineNotifier));

    match execute(command, &mut ledger) {
        Ok(Outcome::Changed) => {
            match save_ledger(store, &ledger) {
                Ok(()) => println!("Data saved successfully!"),
                Err(err) => eprintln!("{} {err}", "Error saving data:".yellow()),
            }
            ExitCode::SUCCESS
        }
        Ok(Outcome::Unchanged) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Apply `command` to the ledger and print its result
fn execute<C: Clock>(command: &Command, ledger: &mut Ledger<C>) -> Result<Outcome, LendingError> {
    match command {
        Command::AddBook { isbn, title, author, category, copies, price, published } => {
            let book = Book::new(
                Isbn::new(isbn),
                title.as_str(),
                author.as_str(),
                *category,
                *copies,
                *price,
                *published,
            )?;
            ledger.add_book(book)?;
            println!("{}", format!("Book '{title}' added successfully!").as_str().green());
            Ok(Outcome::Changed)
        }
        Command::RegisterMember { id, name, class, email, phone } => {
            let identity =
                Identity::new(id.as_str(), name.as_str(), email.as_str(), phone.as_str());
            let member = Member::new(identity, *class, ledger.now());
            ledger.register_member(member)?;
            println!("{}", format!("Member '{name}' registered successfully!").as_str().green());
            Ok(Outcome::Changed)
        }
        Command::Issue { member, isbn } => {
            let (member_id, isbn) = (MemberId::new(member), Isbn::new(isbn));
            let loan = ledger.issue(&member_id, &isbn)?;
            let title = ledger.find_book(&isbn).map_or("?", |book| book.title.as_str());
            let name = ledger.find_member(&member_id).map_or("?", Member::name);
            println!("Book '{title}' issued to {name}");
            if let Some(due) = loan.due_date {
                println!("Due Date: {}", due.format("%Y-%m-%d"));
            }
            Ok(Outcome::Changed)
        }
        Command::Return { member, isbn } => {
            let (member_id, isbn) = (MemberId::new(member), Isbn::new(isbn));
            let fine = ledger.return_book(&member_id, &isbn)?;
            if fine > Decimal::ZERO {
                let notice = format!("Fine of {} applied for late return.", Render::money(fine));
                println!("{}", notice.as_str().red());
            }
            let title = ledger.find_book(&isbn).map_or("?", |book| book.title.as_str());
            println!("Book '{title}' returned successfully!");
            Ok(Outcome::Changed)
        }
        Command::Search { term } => {
            let results = ledger.search_books(term);
            if results.is_empty() {
                println!("No books found matching your search.");
            } else {
                println!("\nFound {} book(s):", results.len());
                for book in results {
                    println!("{}\n{}", Render::book(book), Render::rule());
                }
            }
            Ok(Outcome::Unchanged)
        }
        Command::Books => {
            println!("{}", Render::header("ALL BOOKS"));
            for book in ledger.books() {
                println!("{}\n{}", Render::book(book), Render::rule());
            }
            Ok(Outcome::Unchanged)
        }
        Command::Members => {
            println!("{}", Render::header("ALL MEMBERS"));
            for member in ledger.members() {
                let open_loans = member.open_loan_count(ledger.loans());
                println!("{}\n{}", Render::member(member, open_loans), Render::rule());
            }
            Ok(Outcome::Unchanged)
        }
        Command::History { member } => {
            let member_id = MemberId::new(member);
            let loans = ledger.member_loans(&member_id)?;
            println!("{}", Render::header(&format!("LOANS OF {member_id}")));
            println!("{}", Render::history_table(&loans, ledger.now()));
            Ok(Outcome::Unchanged)
        }
        Command::Overdue => {
            println!("{}", Render::header("OVERDUE BOOKS"));
            let now = ledger.now();
            let mut any = false;
            for entry in ledger.overdue_report(now) {
                any = true;
                println!("{}", Render::overdue_line(&entry));
            }
            if !any {
                println!("No overdue books.");
            }
            Ok(Outcome::Unchanged)
        }
    }
}
