use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use baudprobe::{printable, probe_rate, CancelToken, RateList, SystemSerial};
use tempfile::TempDir;

fn wait_for_file<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<(), ()> {
    let end = SystemTime::now() + timeout;

    loop {
        if path.as_ref().exists() {
            return Ok(());
        }

        if SystemTime::now() > end {
            return Err(());
        }

        thread::sleep(Duration::from_millis(100));
    }
}

/// Pseudo terminal pair linked at `ours` and `theirs`, or `None` when socat
/// is not installed.
fn pty_pair(ours: &Path, theirs: &Path) -> Option<Child> {
    let socat = Command::new("socat")
        .args([
            format!("PTY,link={},raw,echo=0,mode=700", ours.to_str().unwrap()),
            format!("PTY,link={},raw,echo=0,mode=700", theirs.to_str().unwrap()),
        ])
        .spawn();

    match socat {
        Ok(socat) => {
            wait_for_file(ours, Duration::from_millis(1000)).unwrap();
            wait_for_file(theirs, Duration::from_millis(1000)).unwrap();
            Some(socat)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            eprintln!("socat not installed, skipping");
            None
        }
        Err(e) => panic!("could not start socat: {}", e),
    }
}

/// Write `ping` lines to `path` until the returned flag is cleared.
fn keep_talking(path: &Path) -> (Arc<AtomicBool>, thread::JoinHandle<()>) {
    let talking = Arc::new(AtomicBool::new(true));
    let mut device = OpenOptions::new().write(true).open(path).unwrap();
    let handle = {
        let talking = Arc::clone(&talking);
        thread::spawn(move || {
            while talking.load(Ordering::SeqCst) {
                // The pair goes away once the probe hangs up; stop quietly.
                if device.write_all(b"ping\r\n").and_then(|_| device.flush()).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(20));
            }
        })
    };
    (talking, handle)
}

/// Pseudo terminals ignore the line rate, so whatever rate the probe opens
/// at, the window has to see the other end's text.
#[test]
#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), ignore)]
fn test_every_rate_of_a_pass_reads_the_pty() {
    let rates: RateList = "9600,19200,115200".parse().unwrap();

    for &baud_rate in rates.as_slice() {
        let tmp_dir = TempDir::new().unwrap();
        let device_pty = tmp_dir.path().join("ttyV0");
        let probe_pty = tmp_dir.path().join("ttyV1");

        let mut socat = match pty_pair(&device_pty, &probe_pty) {
            Some(socat) => socat,
            None => return,
        };
        let (talking, device) = keep_talking(&device_pty);

        let sample = probe_rate(
            &mut SystemSerial,
            probe_pty.to_str().unwrap(),
            baud_rate,
            Duration::from_millis(300),
            &CancelToken::new(),
        )
        .unwrap();

        talking.store(false, Ordering::SeqCst);
        device.join().unwrap();
        let _ = socat.kill();
        socat.wait().unwrap();

        assert_eq!(sample.baud_rate, baud_rate);
        assert!(!sample.interrupted);
        assert!(
            printable(&sample.data).contains("ping"),
            "nothing read at {} baud",
            baud_rate
        );
    }
}

/// A cancelled window returns long before it would have ended.
#[test]
#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), ignore)]
fn test_cancel_cuts_the_window_short() {
    let tmp_dir = TempDir::new().unwrap();
    let device_pty = tmp_dir.path().join("ttyV0");
    let probe_pty = tmp_dir.path().join("ttyV1");

    let mut socat = match pty_pair(&device_pty, &probe_pty) {
        Some(socat) => socat,
        None => return,
    };

    let cancel = CancelToken::new();
    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            cancel.cancel();
        })
    };

    let started = SystemTime::now();
    let sample = probe_rate(
        &mut SystemSerial,
        probe_pty.to_str().unwrap(),
        9600,
        Duration::from_secs(30),
        &cancel,
    )
    .unwrap();
    canceller.join().unwrap();
    let _ = socat.kill();
    socat.wait().unwrap();

    assert!(sample.interrupted);
    assert!(started.elapsed().unwrap() < Duration::from_secs(5));
}
