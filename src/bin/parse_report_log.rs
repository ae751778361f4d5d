use std::io::stdin;

use padbridge::report::Report;

fn main() {
    for line in stdin().lines() {
        let line = line.unwrap();

        match line.parse::<Report>() {
            Ok(report) => println!("{report:?}"),
            Err(e) => println!("{line} (error {e:?})"),
        }
    }
}
