use slog::debug;
use zbe_core::GlobalLogger;

#[test]
fn get_lazily_initializes_and_is_stable() {
    let first = GlobalLogger::get() as *const GlobalLogger;
    let second = GlobalLogger::get() as *const GlobalLogger;
    assert_eq!(first, second);

    debug!(GlobalLogger::get(), "smoke test");
}
