//! # End-to-end Reader Tests
//!
//! Full instrumentation streams driven through `ConsoleReader` with group
//! files written to a temporary directory.
//!
//! ## Test Categories
//!
//! 1. **Canonical Assembly** - Group arrival order never changes the block
//! 2. **Fatal Paths** - Mismatch, decode failure, protocol violations
//! 3. **Side Artifacts** - Deletion, retention and redaction
//! 4. **Cancellation** - No partial block after shutdown

use block_assembler::{
    encode_group_file, spawn_block_stream, AssemblerError, ConsoleReader, DecodeError,
    ProtocolViolation, ReaderConfig, RedactionPolicy,
};
use shared_types::{AccountChange, BalanceChange, Block, Instruction, LogEntry, Transaction};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio_stream::StreamExt;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn write_group(dir: &Path, name: &str, transactions: &[Transaction]) {
    let bytes = encode_group_file(transactions).unwrap();
    std::fs::write(dir.join(name), bytes).unwrap();
}

fn bare(ids: &[&str]) -> Vec<Transaction> {
    ids.iter().map(|id| Transaction::new(*id)).collect()
}

fn detailed_config(dir: &Path) -> ReaderConfig {
    ReaderConfig::default().with_group_dir(dir)
}

async fn read_all(input: String, config: ReaderConfig) -> Result<Vec<Block>, AssemblerError> {
    let bytes = input.into_bytes();
    let mut reader = ConsoleReader::new(bytes.as_slice(), config)?;
    let mut blocks = Vec::new();
    while let Some(block) = reader.next_block().await? {
        blocks.push(block);
    }
    Ok(blocks)
}

// =============================================================================
// CANONICAL ASSEMBLY
// =============================================================================

#[tokio::test]
async fn test_groups_out_of_order_yield_canonical_block() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g-c.bin", &bare(&["C"]));
    write_group(dir.path(), "g-ab.bin", &bare(&["A", "B"]));

    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 99 100 full p99 A;B;C
FIRE BATCH_FILE g-c.bin
FIRE BATCH_FILE g-ab.bin
FIRE BATCHES_END
FIRE BLOCK_END 100 b100 p99 1700000000 1700000400
"
    .to_string();

    let blocks = read_all(input, detailed_config(dir.path())).await.unwrap();
    assert_eq!(blocks.len(), 1);

    let block = &blocks[0];
    assert_eq!(block.height, 100);
    assert_eq!(block.parent_height, 99);
    assert_eq!(block.id, "b100");
    assert_eq!(block.genesis_unix_timestamp, 1_700_000_000);
    assert_eq!(block.clock_unix_timestamp, 1_700_000_400);
    assert_eq!(block.transaction_ids(), ["A", "B", "C"]);

    let spans: Vec<_> = block
        .transactions
        .iter()
        .map(|t| (t.index, t.begin_ordinal, t.end_ordinal))
        .collect();
    assert_eq!(spans, [(0, 0, 1), (1, 1, 2), (2, 2, 3)]);
}

#[tokio::test]
async fn test_nested_ordinals_shift_per_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let trx = |id: &str| {
        Transaction::new(id).with_instructions(vec![
            Instruction::new("Prog1", 1, 5).with_logs(vec![LogEntry::new("invoke", 2)]),
            Instruction::new("Prog2", 3, 4)
                .nested_under(0, 2)
                .with_logs(vec![LogEntry::new("inner", 3)]),
        ])
    };
    write_group(dir.path(), "g.bin", &[trx("y"), trx("x")]);

    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 1 2 full p1 x;y
FIRE BATCH_FILE g.bin
FIRE BATCHES_END
FIRE BLOCK_END 2 b2 p1 0 0
"
    .to_string();

    let block = read_all(input, detailed_config(dir.path()))
        .await
        .unwrap()
        .remove(0);

    let x = &block.transactions[0];
    let y = &block.transactions[1];
    assert_eq!((x.id.as_str(), x.begin_ordinal, x.end_ordinal), ("x", 0, 6));
    assert_eq!((y.id.as_str(), y.begin_ordinal, y.end_ordinal), ("y", 6, 12));
    assert_eq!(y.instructions[0].begin_ordinal, 7);
    assert_eq!(y.instructions[1].logs[0].ordinal, 9);
    assert_eq!(block.last_ordinal(), 12);
}

#[tokio::test]
async fn test_partial_work_reports_merge() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g1.bin", &bare(&["b", "a"]));
    write_group(dir.path(), "g2.bin", &bare(&["c"]));

    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 4 5 partial p4 a;b
FIRE BATCH_FILE g1.bin
FIRE BLOCK_WORK 4 5 full p4 a;b;c
FIRE BATCH_FILE g2.bin
FIRE BATCHES_END
FIRE BLOCK_END 5 b5 p4 0 0
"
    .to_string();

    let block = read_all(input, detailed_config(dir.path()))
        .await
        .unwrap()
        .remove(0);
    assert_eq!(block.transaction_ids(), ["a", "b", "c"]);
}

#[tokio::test]
async fn test_root_stamped_on_later_blocks() {
    let input = "\
FIRE INIT 1 minimal 1.18.22
FIRE BLOCK_WORK 9 10 full p9 t1
FIRE BLOCK_END 10 b10 p9 0 0
FIRE BLOCK_ROOT 8
FIRE BLOCK_WORK 10 11 full b10 t2
FIRE BLOCK_ROOT 9
FIRE BLOCK_END 11 b11 b10 0 0
"
    .to_string();

    let blocks = read_all(input, ReaderConfig::default()).await.unwrap();
    let roots: Vec<_> = blocks.iter().map(|b| b.last_irreversible_height).collect();
    assert_eq!(roots, [0, 9]);
}

#[tokio::test]
async fn test_minimal_variant_never_reads_group_files() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &bare(&["zz"]));

    let input = "\
FIRE INIT 1 minimal 1.18.22
FIRE BLOCK_WORK 1 2 full p1 a;b
FIRE BATCH_FILE g.bin
FIRE BATCHES_END
FIRE BLOCK_END 2 b2 p1 0 0
"
    .to_string();

    let blocks = read_all(input, detailed_config(dir.path())).await.unwrap();
    assert_eq!(blocks[0].transaction_ids(), ["a", "b"]);
    assert!(blocks[0].transactions.iter().all(|t| t.instructions.is_empty()));
    // Untouched: a decode would have deleted it
    assert!(dir.path().join("g.bin").exists());
}

#[tokio::test]
async fn test_incomplete_assembly_discarded_at_end_of_input() {
    let input = "\
FIRE INIT 1 minimal 1.18.22
FIRE BLOCK_WORK 1 2 full p1 a
FIRE BLOCK_END 2 b2 p1 0 0
FIRE BLOCK_WORK 2 3 full b2 b
"
    .to_string();

    let blocks = read_all(input, ReaderConfig::default()).await.unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].height, 2);
}

#[tokio::test]
async fn test_pipelined_heights_finalize_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g5.bin", &bare(&["a"]));
    write_group(dir.path(), "g6.bin", &bare(&["b"]));

    // Height 6 starts decoding before height 5 is finalized
    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 4 5 full p4 a
FIRE BATCH_FILE g5.bin
FIRE BLOCK_WORK 5 6 full b5 b
FIRE BATCH_FILE g6.bin
FIRE BLOCK_WORK 4 5 full p4 a
FIRE BLOCK_END 5 b5 p4 0 0
FIRE BLOCK_WORK 5 6 full b5 b
FIRE BLOCK_END 6 b6 b5 0 0
"
    .to_string();

    let blocks = read_all(input, detailed_config(dir.path())).await.unwrap();

    let summary: Vec<_> = blocks
        .iter()
        .map(|b| (b.height, b.transaction_ids().join(",")))
        .collect();
    assert_eq!(summary, [(5, "a".to_string()), (6, "b".to_string())]);
    assert_eq!(blocks[1].parent_id, "b5");
    assert!(!dir.path().join("g5.bin").exists());
    assert!(!dir.path().join("g6.bin").exists());
}

#[tokio::test]
async fn test_end_for_older_height_while_newer_active() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g5.bin", &bare(&["a"]));
    write_group(dir.path(), "g6.bin", &bare(&["b"]));

    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 4 5 full p4 a
FIRE BATCH_FILE g5.bin
FIRE BLOCK_WORK 5 6 full b5 b
FIRE BATCH_FILE g6.bin
FIRE BLOCK_END 5 b5 p4 0 0
"
    .to_string();

    let err = read_all(input, detailed_config(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Protocol {
            violation: ProtocolViolation::HeightMismatch {
                active: 6,
                received: 5
            },
            ..
        }
    ));
}

// =============================================================================
// FATAL PATHS
// =============================================================================

#[tokio::test]
async fn test_count_mismatch_emits_no_block() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &bare(&["A", "B"]));

    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 1 2 full p1 A;B;C
FIRE BATCH_FILE g.bin
FIRE BLOCK_END 2 b2 p1 0 0
"
    .to_string();

    let mut reader =
        ConsoleReader::new(input.as_bytes(), detailed_config(dir.path())).unwrap();
    let err = reader.next_block().await.unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::AssemblyMismatch {
            height: 2,
            decoded: 2,
            expected: 3
        }
    ));
    assert!(reader.next_block().await.unwrap().is_none());
    assert_eq!(reader.stats().blocks_emitted, 0);
}

#[tokio::test]
async fn test_missing_group_file_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 1 2 full p1 A
FIRE BATCH_FILE nowhere.bin
FIRE BATCHES_END
FIRE BLOCK_END 2 b2 p1 0 0
"
    .to_string();

    let err = read_all(input, detailed_config(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Decode {
            height: 2,
            source: DecodeError::Io { .. }
        }
    ));
}

#[tokio::test]
async fn test_corrupt_group_file_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.bin"), [9, 0, 0, 0, 1, 2]).unwrap();
    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 1 2 full p1 A
FIRE BATCH_FILE bad.bin
FIRE BLOCK_END 2 b2 p1 0 0
"
    .to_string();

    let err = read_all(input, detailed_config(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Decode {
            source: DecodeError::Malformed { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_second_handshake_always_fails() {
    for prefix in [
        "",
        "FIRE BLOCK_WORK 1 2 full p1 a\n",
        "FIRE BLOCK_WORK 1 2 full p1 a\nFIRE BLOCK_END 2 b2 p1 0 0\n",
    ] {
        let input = format!(
            "FIRE INIT 1 minimal 1.18.22\n{}FIRE INIT 1 minimal 1.18.22\n",
            prefix
        );
        let err = read_all(input, ReaderConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            AssemblerError::Protocol {
                violation: ProtocolViolation::DuplicateHandshake,
                ..
            }
        ));
    }
}

#[tokio::test]
async fn test_block_end_without_active_assembly() {
    let input = "\
FIRE INIT 1 minimal 1.18.22
FIRE BLOCK_END 7 b7 p6 0 0
"
    .to_string();

    let err = read_all(input, ReaderConfig::default()).await.unwrap_err();
    match err {
        AssemblerError::Protocol { line, violation } => {
            assert_eq!(line, "FIRE BLOCK_END 7 b7 p6 0 0");
            assert_eq!(violation, ProtocolViolation::NoActiveAssembly { height: 7 });
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_detailed_without_group_dir() {
    let err = read_all(
        "FIRE INIT 1 detailed 1.18.22\n".to_string(),
        ReaderConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AssemblerError::Configuration(_)));
}

#[tokio::test]
async fn test_group_file_outside_dir_is_rejected() {
    let groups = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    write_group(elsewhere.path(), "victim.bin", &bare(&["A"]));
    let victim = elsewhere.path().join("victim.bin");

    for name in [victim.display().to_string(), "../victim.bin".to_string()] {
        let input = format!(
            "FIRE INIT 1 detailed 1.18.22\n\
             FIRE BLOCK_WORK 1 2 full p1 A\n\
             FIRE BATCH_FILE {name}\n\
             FIRE BATCHES_END\n\
             FIRE BLOCK_END 2 b2 p1 0 0\n"
        );

        let err = read_all(input, detailed_config(groups.path()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssemblerError::Decode {
                height: 2,
                source: DecodeError::Io { .. }
            }
        ));
        assert!(victim.exists(), "{name} must not be deleted");
    }
}

#[tokio::test]
async fn test_overflowing_group_ordinals_are_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    write_group(
        dir.path(),
        "g.bin",
        &[
            Transaction::new("a").with_instructions(vec![Instruction::new("p", 1, 2)]),
            Transaction::new("b")
                .with_instructions(vec![Instruction::new("p", u64::MAX - 1, u64::MAX)]),
        ],
    );
    let input = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 1 2 full p1 a;b
FIRE BATCH_FILE g.bin
FIRE BATCHES_END
FIRE BLOCK_END 2 b2 p1 0 0
"
    .to_string();

    let err = read_all(input, detailed_config(dir.path()))
        .await
        .unwrap_err();
    match err {
        AssemblerError::Decode {
            height: 2,
            source: DecodeError::OrdinalOverflow { id },
        } => assert_eq!(id, "b"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unsupported_variant() {
    let err = read_all(
        "FIRE INIT 1 verbose 1.18.22\n".to_string(),
        ReaderConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Protocol {
            violation: ProtocolViolation::UnsupportedVariant(_),
            ..
        }
    ));
}

// =============================================================================
// SIDE ARTIFACTS
// =============================================================================

fn account_heavy(id: &str) -> Transaction {
    let change = AccountChange {
        pubkey: "acct".to_string(),
        prev_data: vec![0; 32],
        new_data: vec![1; 32],
        new_data_length: 32,
    };
    Transaction::new(id).with_instructions(vec![
        Instruction::new("Vote111", 1, 2)
            .with_account_changes(vec![change.clone()])
            .with_balance_changes(vec![BalanceChange {
                pubkey: "acct".to_string(),
                prev_lamports: 5,
                new_lamports: 4,
            }]),
        Instruction::new("Token222", 3, 4).with_account_changes(vec![change]),
    ])
}

const ONE_GROUP: &str = "\
FIRE INIT 1 detailed 1.18.22
FIRE BLOCK_WORK 1 2 full p1 t
FIRE BATCH_FILE g.bin
FIRE BATCHES_END
FIRE BLOCK_END 2 b2 p1 0 0
";

#[tokio::test]
async fn test_group_files_deleted_after_decode() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &[account_heavy("t")]);

    let blocks = read_all(ONE_GROUP.to_string(), detailed_config(dir.path()))
        .await
        .unwrap();
    assert_eq!(blocks[0].transactions[0].instructions[1].account_changes.len(), 1);
    assert!(!dir.path().join("g.bin").exists());
}

#[tokio::test]
async fn test_group_files_kept_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &[account_heavy("t")]);

    let config = ReaderConfig {
        keep_group_files: true,
        ..detailed_config(dir.path())
    };
    read_all(ONE_GROUP.to_string(), config).await.unwrap();
    assert!(dir.path().join("g.bin").exists());
}

#[tokio::test]
async fn test_blacklist_redaction() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &[account_heavy("t")]);

    let config = detailed_config(dir.path())
        .with_redaction(RedactionPolicy::with_blacklist(["Vote111"]));
    let block = read_all(ONE_GROUP.to_string(), config)
        .await
        .unwrap()
        .remove(0);

    let instructions = &block.transactions[0].instructions;
    assert!(instructions[0].account_changes.is_empty());
    assert_eq!(instructions[0].balance_changes.len(), 1);
    assert_eq!(instructions[1].account_changes.len(), 1);
}

#[tokio::test]
async fn test_strip_all_redaction() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &[account_heavy("t")]);

    let config = detailed_config(dir.path()).with_redaction(RedactionPolicy::strip_all());
    let block = read_all(ONE_GROUP.to_string(), config)
        .await
        .unwrap()
        .remove(0);
    assert!(block.transactions[0]
        .instructions
        .iter()
        .all(|i| i.account_changes.is_empty()));
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[tokio::test]
async fn test_cancellation_mid_stream_emits_no_partial_block() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "g.bin", &bare(&["a"]));

    let (mut writer, pipe) = tokio::io::duplex(1024);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = ConsoleReader::new(BufReader::new(pipe), detailed_config(dir.path()))
        .unwrap()
        .with_shutdown(shutdown_rx);
    let (mut stream, handle) = spawn_block_stream(reader, 4);

    writer
        .write_all(b"FIRE INIT 1 detailed 1.18.22\nFIRE BLOCK_WORK 1 2 full p1 a\nFIRE BATCH_FILE g.bin\n")
        .await
        .unwrap();

    // Reader is now blocked waiting for BLOCK_END
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();

    let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap();
    assert!(next.is_none());

    let stats = handle.await.unwrap();
    assert_eq!(stats.blocks_emitted, 0);
    assert_eq!(stats.events_dispatched, 3);
    drop(writer);
}
