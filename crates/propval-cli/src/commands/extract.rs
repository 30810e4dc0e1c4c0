//! `propval extract` — dump one field of a prediction report.

use propval_core::report::{self, ReportField};

pub fn run(field: &str, hour: Option<u32>, frequency: Option<u32>, input: &str, json: bool) {
    let field: ReportField = match field.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{e}");
            let known: Vec<&str> = ReportField::ALL.iter().map(|f| f.label()).collect();
            eprintln!("Known fields: {}", known.join(", "));
            std::process::exit(1);
        }
    };

    let document = match report::read_report(input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let records = report::parse(&document, field, hour, frequency);

    if json {
        match serde_json::to_string_pretty(&records) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize records: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if records.is_empty() {
        println!("No {field} values found in {input}");
        return;
    }

    println!("{:>4} {:>5} {:>10}", "Hour", "MHz", field.label());
    println!("{}", "-".repeat(21));
    for r in &records {
        println!("{:>4} {:>5} {:>10}", r.hour, r.frequency, r.value);
    }
}
