use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::NamedTempFile;

mod common;

#[test]
fn test_malformed_csv_handling() {
    let script = NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(script.path()).unwrap();
    wtr.write_record(["type", "requester", "request", "value", "kind"])
        .unwrap();

    // Valid request
    wtr.write_record(["request", "alice", "", "0.001", "rarity"])
        .unwrap();
    // Invalid type
    wtr.write_record(["mint", "alice", "", "0.001", "rarity"])
        .unwrap();
    // Missing fee
    wtr.write_record(["request", "alice", "", "", "rarity"])
        .unwrap();
    // Unknown kind
    wtr.write_record(["request", "alice", "", "0.001", "jackpot"])
        .unwrap();
    wtr.write_record(["fulfill", "", "1", "42", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    Command::new(cargo_bin!("oracle-relay"))
        .arg(script.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stdout(predicate::str::contains("1,alice,rarity,fulfilled,st-bernard,42"))
        .stdout(predicate::str::contains("2,").not());
}

#[test]
fn test_invalid_data_types() {
    let script = common::script(&[
        "request, alice, , not_a_number, rarity",
        "fulfill, , 1, -5,",
        "price, , , cheap,",
        "request, bob, , 0.5, rarity",
        "fulfill, , 1, 7,",
    ]);

    Command::new(cargo_bin!("oracle-relay"))
        .arg(script.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stdout(predicate::str::contains("1,bob,rarity,fulfilled,pug,7"));
}

#[test]
fn test_rejected_operations_do_not_stop_the_run() {
    let script = common::script(&[
        // Below the 0.001 minimum
        "request, alice, , 0.0001, rarity",
        "request, bob, , 0.001, rarity",
        // Not the owner
        "withdraw, mallory, , ,",
        // Nothing pending under this id
        "fulfill, , 9, ,",
        "fulfill, , 1, 55,",
    ]);

    Command::new(cargo_bin!("oracle-relay"))
        .arg(script.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error processing event"))
        .stderr(predicate::str::contains("insufficient fee"))
        .stdout(predicate::str::contains("1,bob,rarity,fulfilled,st-bernard,55"));
}

#[test]
fn test_duplicate_fulfillment_keeps_first_value() {
    let script = common::script(&[
        "request, alice, , 0.001, rarity",
        "fulfill, , 1, 5,",
        "fulfill, , 1, 95,",
    ]);

    Command::new(cargo_bin!("oracle-relay"))
        .arg(script.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1,alice,rarity,fulfilled,pug,5"));
}

#[test]
fn test_overflowing_fee_is_rejected() {
    let script = common::script(&[
        "request, alice, , 79228162514264337593543950335, rarity",
        "request, bob, , 79228162514264337593543950335, rarity",
        "fulfill, , 1, 3,",
    ]);

    Command::new(cargo_bin!("oracle-relay"))
        .arg(script.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error processing event"))
        .stderr(predicate::str::contains("overflow the treasury balance"))
        .stdout(predicate::str::contains("1,alice,rarity,fulfilled,pug,3"))
        .stdout(predicate::str::contains("bob").not());
}
