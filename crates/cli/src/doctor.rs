//! `adt doctor` (SPEC_FULL §4.12): structural + connectivity checks,
//! modeled after the teacher's own multi-check `doctor` subcommand.

use adt_domain::config::Severity;
use adt_domain::Config;

pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("adt doctor");
    println!("==========\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_connectivity(config, &mut all_passed).await;
    check_credential(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

async fn check_connectivity(config: &Config, all_passed: &mut bool) {
    let url = &config.base_url;
    let reachable = match reqwest::Client::builder()
        .danger_accept_invalid_certs(!config.tls_verify)
        .timeout(std::time::Duration::from_secs(5))
        .build()
    {
        Ok(client) => client.get(url).send().await.is_ok(),
        Err(_) => false,
    };

    print_check(
        "ABAP system reachable",
        reachable,
        if reachable {
            url.clone()
        } else {
            format!("{url} (unreachable)")
        },
    );

    if !reachable {
        *all_passed = false;
    }
}

fn check_credential(config: &Config, all_passed: &mut bool) {
    let resolved = if config.credential.session_cookie.is_some() {
        Ok("session cookie".to_string())
    } else {
        crate::credentials::resolve_password(&config.credential).map(|_| "resolved".to_string())
    };

    match resolved {
        Ok(detail) => print_check("Credential resolvable", true, detail),
        Err(e) => {
            print_check("Credential resolvable", false, e.to_string());
            *all_passed = false;
        }
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
