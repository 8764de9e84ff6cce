#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn helpdesk(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("helpdesk").unwrap();
    cmd.current_dir(dir.path())
        .env("HELPDESK_ROOT", dir.path())
        .env_remove("HELPDESK_ACTOR")
        .env_remove("HELPDESK_ROLE");
    cmd
}

fn as_role(dir: &TempDir, actor: &str, role: &str) -> Command {
    let mut cmd = helpdesk(dir);
    cmd.args(["--actor", actor, "--role", role]);
    cmd
}

fn init_desk(dir: &TempDir) {
    helpdesk(dir).arg("init").assert().success();
}

fn json_of(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.arg("--json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

/// Opens a ticket as an L1 agent and returns its id.
fn open_ticket(dir: &TempDir) -> String {
    let ticket = json_of(as_role(dir, "alice", "L1").args([
        "ticket",
        "create",
        "--title",
        "VPN keeps dropping",
        "--description",
        "Drops every ten minutes since Monday",
        "--category",
        "network-problem",
        "--priority",
        "High",
        "--due",
        "2099-12-31",
    ]));
    ticket["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// init / config
// ---------------------------------------------------------------------------

#[test]
fn init_creates_workspace() {
    let dir = TempDir::new().unwrap();
    helpdesk(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .helpdesk/config.yaml"));

    assert!(dir.path().join(".helpdesk/tickets").is_dir());
    assert!(dir.path().join(".helpdesk/config.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    helpdesk(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .helpdesk/config.yaml"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    helpdesk(&dir)
        .args(["ticket", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn default_config_validates() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    helpdesk(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn http_store_without_url_fails_validation() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    std::fs::write(
        dir.path().join(".helpdesk/config.yaml"),
        "project:\n  name: desk\nstore:\n  type: http\n",
    )
    .unwrap();
    helpdesk(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("store.url"));
}

// ---------------------------------------------------------------------------
// identity
// ---------------------------------------------------------------------------

#[test]
fn create_requires_actor() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    helpdesk(&dir)
        .args([
            "ticket",
            "create",
            "--title",
            "Printer jam",
            "--description",
            "Tray two jams on every job",
            "--due",
            "2099-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--actor is required"));
}

#[test]
fn unknown_role_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);
    as_role(&dir, "zed", "L9")
        .args(["ticket", "policy", &id])
        .assert()
        .failure();
}

#[test]
fn l2_cannot_open_tickets() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    as_role(&dir, "bo", "L2")
        .args([
            "ticket",
            "create",
            "--title",
            "Printer jam",
            "--description",
            "Tray two jams on every job",
            "--due",
            "2099-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open tickets"));
}

// ---------------------------------------------------------------------------
// lifecycle
// ---------------------------------------------------------------------------

#[test]
fn created_ticket_starts_new_at_l1() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);
    assert!(id.starts_with("TCK-"));
    assert!(dir
        .path()
        .join(format!(".helpdesk/tickets/{id}.yaml"))
        .exists());

    let ticket = json_of(helpdesk(&dir).args(["ticket", "show", &id]));
    assert_eq!(ticket["status"], "New");
    assert_eq!(ticket["currentTier"], "L1");
    assert!(ticket.get("severity").is_none());
}

#[test]
fn l1_full_lifecycle() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);

    let started = json_of(as_role(&dir, "alice", "L1").args(["ticket", "start", &id]));
    assert_eq!(started["status"], "Attending");

    let completed = json_of(as_role(&dir, "alice", "L1").args(["ticket", "complete", &id]));
    assert_eq!(completed["status"], "Completed");

    let closed = json_of(as_role(&dir, "alice", "L1").args([
        "ticket",
        "close",
        &id,
        "--resolution",
        "Replaced the router firmware",
    ]));
    assert_eq!(closed["status"], "Resolved");
    assert_eq!(closed["resolution"], "Replaced the router firmware");

    helpdesk(&dir)
        .args(["ticket", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activity:"))
        .stdout(predicate::str::contains("resolved"));
}

#[test]
fn status_command_cannot_resolve() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);
    as_role(&dir, "alice", "L1")
        .args(["ticket", "status", &id, "Resolved"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("through close"));

    let policy = json_of(as_role(&dir, "alice", "L1").args(["ticket", "policy", &id]));
    let targets = policy["status_targets"].as_array().unwrap();
    assert!(!targets.iter().any(|t| t == "Resolved"));
}

#[test]
fn escalation_chain_with_severity() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);

    // L2 cannot touch an L1 ticket.
    as_role(&dir, "bo", "L2")
        .args(["ticket", "severity", &id, "C1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not permitted"));

    let escalated = json_of(as_role(&dir, "alice", "L1").args([
        "ticket",
        "escalate",
        &id,
        "--reason",
        "Needs network team",
    ]));
    assert_eq!(escalated["currentTier"], "L2");

    let sev = json_of(as_role(&dir, "bo", "L2").args(["ticket", "severity", &id, "C1"]));
    assert_eq!(sev["severity"], "C1");

    let policy = json_of(as_role(&dir, "bo", "L2").args(["ticket", "policy", &id]));
    assert_eq!(policy["can_escalate"], true);
    assert_eq!(policy["escalation_target"], "L3");

    let top = json_of(as_role(&dir, "bo", "L2").args([
        "ticket",
        "escalate",
        &id,
        "--reason",
        "Core switch fault",
    ]));
    assert_eq!(top["currentTier"], "L3");

    as_role(&dir, "cy", "L3")
        .args(["ticket", "escalate", &id, "--reason", "nowhere to go"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("L3 is the top tier"));
}

#[test]
fn policy_text_output_for_admin_shows_no_actions() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);
    let policy = json_of(as_role(&dir, "root", "ADMIN").args(["ticket", "policy", &id]));
    assert_eq!(policy["has_any_action"], false);
    assert_eq!(policy["can_start_work"], false);

    as_role(&dir, "alice", "L1")
        .args(["ticket", "policy", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("start work"));
}

#[test]
fn note_appends_to_activity_log() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);
    let ticket = json_of(as_role(&dir, "alice", "L1").args([
        "ticket",
        "note",
        &id,
        "--details",
        "Called the user back",
    ]));
    let log = ticket["activityLog"].as_array().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1]["detail"], "Called the user back");
}

#[test]
fn past_due_date_is_refused_at_creation() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    as_role(&dir, "alice", "L1")
        .args([
            "ticket",
            "create",
            "--title",
            "Old problem",
            "--description",
            "Something from last year",
            "--due",
            "2001-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("due date cannot be in the past"));
}

#[test]
fn frozen_ticket_refuses_changes() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let id = open_ticket(&dir);
    let path = dir.path().join(format!(".helpdesk/tickets/{id}.yaml"));
    let yaml = std::fs::read_to_string(&path).unwrap();
    let past = yaml.replace("2099-12-31T23:59:59Z", "2001-01-01T00:00:00Z");
    assert_ne!(yaml, past);
    std::fs::write(&path, past).unwrap();

    let policy = json_of(as_role(&dir, "alice", "L1").args(["ticket", "policy", &id]));
    assert_eq!(policy["frozen"], true);

    as_role(&dir, "alice", "L1")
        .args(["ticket", "start", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("past its due date"));
}

#[test]
fn show_missing_ticket_fails() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    helpdesk(&dir)
        .args(["ticket", "show", "TCK-MISSING"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TCK-MISSING"));
}

// ---------------------------------------------------------------------------
// list / stats
// ---------------------------------------------------------------------------

#[test]
fn list_filters_by_level() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    let first = open_ticket(&dir);
    let _second = open_ticket(&dir);
    as_role(&dir, "alice", "L1")
        .args(["ticket", "escalate", &first, "--reason", "vendor bug"])
        .assert()
        .success();

    let page = json_of(helpdesk(&dir).args(["ticket", "list", "--level", "L2"]));
    let tickets = page["tickets"].as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["id"], first.as_str());
    assert_eq!(page["pagination"]["totalItems"], 1);

    helpdesk(&dir)
        .args(["ticket", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VPN keeps dropping"))
        .stdout(predicate::str::contains("(2 tickets)"));
}

#[test]
fn empty_list_says_so() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    helpdesk(&dir)
        .args(["ticket", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tickets."));
}

#[test]
fn stats_counts_tickets() {
    let dir = TempDir::new().unwrap();
    init_desk(&dir);
    open_ticket(&dir);
    let stats = json_of(helpdesk(&dir).arg("stats"));
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["open"], 1);
    assert_eq!(stats["highPriority"], 1);
    assert_eq!(stats["byTier"]["L1"], 1);
}
