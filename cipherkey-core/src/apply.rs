//! The key-application protocol: ordered directive execution followed
//! by the validation and population probes.

use crate::directive::Directives;
use crate::engine::{EngineFault, KeyingEngine, TransactionGuard};
use crate::error::{KeyingError, KeyingResult};
use crate::plan::OrderedPlan;
use tracing::{debug, warn};

/// The persisted header counter used purely as a liveness probe.
/// Reading it forces a page-1 decryption; writing it back unchanged
/// forces an empty file to be materialized as an encrypted container.
const PROBE_DIRECTIVE: &str = "user_version";

/// Acknowledgment the engine returns for key-setting directives.
const KEY_ACK: &str = "ok";

/// Applies cipher configuration and exactly one key to a connection.
///
/// Directives are ordered (cipher selection first, key last), applied
/// one at a time with their acknowledgments validated, and the result
/// is probed: a read of `user_version` detects a wrong key against
/// existing data, and a transactional write-back of the same value
/// forces an empty file to be populated so the key demonstrably took
/// effect. A read-only connection cannot be populated; that case is
/// tolerated and still reports success.
///
/// On [`KeyingError::DirectiveRejected`] the connection keeps the
/// settings applied up to the failing directive; nothing is rolled
/// back. All failures are terminal — correcting the input and calling
/// again is the caller's job.
pub fn apply_keying<E>(engine: &mut E, directives: Directives) -> KeyingResult<()>
where
    E: KeyingEngine + ?Sized,
{
    if engine.in_transaction() {
        return Err(KeyingError::AlreadyInTransaction);
    }

    let plan = OrderedPlan::build(directives)?;
    apply_plan(engine, &plan)?;
    read_probe(engine)?;
    write_probe(engine)
}

/// Executes each directive in plan order, validating acknowledgments.
fn apply_plan<E>(engine: &mut E, plan: &OrderedPlan) -> KeyingResult<()>
where
    E: KeyingEngine + ?Sized,
{
    debug!(
        "applying {} directive(s), keyed by '{}'",
        plan.len(),
        plan.key_directive().name()
    );
    for directive in plan.iter() {
        // Key pragmas acknowledge with a literal token; everything
        // else is expected to echo back the effective setting.
        let expected = if directive.kind().is_key() {
            KEY_ACK.to_string()
        } else {
            directive.value().to_string()
        };

        let got = match engine.execute_directive(directive.name(), directive.value()) {
            Ok(response) => response,
            Err(fault) => {
                return Err(KeyingError::DirectiveRejected {
                    name: directive.name().to_string(),
                    expected,
                    got: fault.to_string(),
                });
            }
        };

        if got != expected {
            return Err(KeyingError::DirectiveRejected {
                name: directive.name().to_string(),
                expected,
                got,
            });
        }
        debug!("directive '{}' acknowledged", directive.name());
    }
    Ok(())
}

/// Reads `user_version`. On a populated file this forces a page read,
/// so a wrong key or corrupt header surfaces here.
fn read_probe<E>(engine: &mut E) -> KeyingResult<()>
where
    E: KeyingEngine + ?Sized,
{
    match engine.query_directive(PROBE_DIRECTIVE) {
        Ok(value) => {
            debug!("read probe ok, {PROBE_DIRECTIVE}={value}");
            Ok(())
        }
        Err(EngineFault::NotADatabase(msg)) => Err(KeyingError::WrongKeyOrFormat(msg)),
        Err(fault) => Err(KeyingError::ProbeFailed(fault.to_string())),
    }
}

/// Writes `user_version` back to its current value inside a scoped
/// transaction. The write is what populates an empty file; the
/// transaction keeps a partial header write from ever being visible.
fn write_probe<E>(engine: &mut E) -> KeyingResult<()>
where
    E: KeyingEngine + ?Sized,
{
    match write_probe_txn(engine) {
        Ok(()) => Ok(()),
        // No write permission means no population is possible, and
        // none was expected: a read-only open succeeds as-is.
        Err(EngineFault::ReadOnly(msg)) => {
            warn!("write probe skipped on read-only connection: {msg}");
            Ok(())
        }
        Err(fault) => Err(KeyingError::ProbeFailed(fault.to_string())),
    }
}

fn write_probe_txn<E>(engine: &mut E) -> Result<(), EngineFault>
where
    E: KeyingEngine + ?Sized,
{
    let mut guard = TransactionGuard::begin(engine)?;
    let raw = guard.engine().query_directive(PROBE_DIRECTIVE)?;
    let current: i64 = raw
        .trim()
        .parse()
        .map_err(|_| EngineFault::Other(format!("{PROBE_DIRECTIVE} is not an integer: '{raw}'")))?;
    guard
        .engine()
        .execute_directive(PROBE_DIRECTIVE, &current.into())?;
    guard.commit()?;
    debug!("write probe committed, {PROBE_DIRECTIVE}={current}");
    Ok(())
}
