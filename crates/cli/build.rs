use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("juscrape")
        .version("0.1.0")
        .about("Extract case records from saved court-system pages")
        .arg(clap::arg!(<INPUT> "Saved HTML snapshot of the case page, or '-' for stdin"))
        .arg(
            clap::arg!(-s --system <SYSTEM> "Court system (inferred from --url when omitted)")
                .value_name("SYSTEM")
                .value_parser(["projudi", "pje-tjba", "pje-trt5"]),
        )
        .arg(clap::arg!(--url <URL> "URL the snapshot was taken from").value_name("URL"))
        .arg(
            clap::arg!(--frame <FRAME> "Nested frame snapshot, as SELECTOR=FILE (repeatable)")
                .value_name("SELECTOR=FILE")
                .action(clap::ArgAction::Append),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (json, text)")
                .value_name("FORMAT")
                .default_value("json")
                .value_parser(["json", "text"]),
        )
        .arg(clap::arg!(--timeout <SECS> "Readiness and HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--skip_documents "Do not open docket documents"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "juscrape", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "juscrape", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "juscrape", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "juscrape", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
