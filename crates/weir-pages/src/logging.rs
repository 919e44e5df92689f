//! Logging macros shared by native and wasm32 client code.
//!
//! | Macro | Debug Assertions | Feature Required | WASM | Native |
//! |-------|------------------|------------------|------|--------|
//! | `debug_log!` | Required | `debug-hooks` | `console.debug` | `tracing::debug!` |
//! | `info_log!` | Required | None | `console.info` | `tracing::info!` |
//! | `warn_log!` | Required | None | `console.warn` | `tracing::warn!` |
//! | `error_log!` | Required | None | `console.error` | `tracing::error!` |
//!
//! Without `debug_assertions` every macro compiles to nothing; the
//! arguments are still type-checked.
//!
//! ```
//! use weir_pages::{info_log, warn_log};
//!
//! info_log!("registered {} listeners", 3);
//! warn_log!("no bindings for key `{}`", "k1");
//! ```

/// Logs a debug message (requires `debug-hooks` + `debug_assertions`).
#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-hooks", target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::debug_1(&format!($($arg)*).into());
	}};
}

#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-hooks", not(target_arch = "wasm32")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::debug!("{}", format_args!($($arg)*));
	}};
}

#[macro_export]
#[cfg(not(all(debug_assertions, feature = "debug-hooks")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs an info message (requires `debug_assertions`).
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::info_1(&format!($($arg)*).into());
	}};
}

#[macro_export]
#[cfg(all(debug_assertions, not(target_arch = "wasm32")))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::info!("{}", format_args!($($arg)*));
	}};
}

#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs a warning (requires `debug_assertions`).
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::warn_1(&format!($($arg)*).into());
	}};
}

#[macro_export]
#[cfg(all(debug_assertions, not(target_arch = "wasm32")))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::warn!("{}", format_args!($($arg)*));
	}};
}

#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs an error (requires `debug_assertions`).
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::error_1(&format!($($arg)*).into());
	}};
}

#[macro_export]
#[cfg(all(debug_assertions, not(target_arch = "wasm32")))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::error!("{}", format_args!($($arg)*));
	}};
}

#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

#[cfg(test)]
mod tests {
	use crate::{debug_log, error_log, info_log, warn_log};
	use rstest::rstest;
	use std::io::Write;
	use std::sync::{Arc, Mutex};
	use tracing_subscriber::layer::SubscriberExt;

	#[derive(Clone, Default)]
	struct Captured(Arc<Mutex<Vec<u8>>>);

	impl Write for Captured {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.lock().map_err(|_| std::io::ErrorKind::Other)?.extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	#[rstest]
	fn test_macros_accept_format_arguments() {
		debug_log!("debug {}", 42);
		info_log!("info {}", "x");
		warn_log!("warn {:?}", vec![1, 2, 3]);
		error_log!("plain");
	}

	#[cfg(debug_assertions)]
	#[rstest]
	fn test_native_macros_go_through_tracing() {
		// Arrange
		let captured = Captured::default();
		let writer = captured.clone();
		let subscriber = tracing_subscriber::registry().with(
			tracing_subscriber::fmt::layer()
				.with_ansi(false)
				.without_time()
				.with_writer(move || writer.clone()),
		);

		// Act
		tracing::subscriber::with_default(subscriber, || {
			warn_log!("no bindings for key `{}`", "k1");
		});

		// Assert
		let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
		assert!(output.contains("WARN"));
		assert!(output.contains("no bindings for key `k1`"));
	}
}
