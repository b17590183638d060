//! Applet discovery and the immutable applet catalog.
//!
//! Discovery happens exactly once, while the host is being constructed:
//! the image is asked to list itself (`<image-name> --list`) with stdout
//! captured on a pipe, and each non-empty output line becomes one applet
//! name, in the order the image printed them. The listing output is taken
//! verbatim between line boundaries; if an image ever prefixes its listing
//! lines, the prefix becomes part of the name.

use crate::error::LoadError;
use crate::image::Image;
use crate::invoke;
use crate::lines::NonEmptyLines;
use std::fs::File;
use std::os::fd::AsFd;

/// Argument that switches the image into its self-listing mode.
const LISTING_FLAG: &str = "--list";

/// The ordered set of applet names an image reported at load time.
///
/// Immutable after construction; shared freely across threads.
#[derive(Debug)]
pub struct AppletCatalog {
    names: Vec<String>,
}

impl AppletCatalog {
    /// Number of discovered applets.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the image reported no applets at all.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name at `index`, in the image's listing order.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Whether `name` is one of the discovered applets.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Iterate the names in listing order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.names.iter())
    }

    #[cfg(test)]
    pub(crate) fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl<'a> IntoIterator for &'a AppletCatalog {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Iterator over catalog entries.
pub struct Iter<'a>(std::slice::Iter<'a, String>);

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.0.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Run the image's self-listing mode and build the catalog from its output.
///
/// The write end of the capture pipe is dropped in the parent as soon as
/// the child exists, so end of stream on the read end tracks child exit.
/// Draining happens before reaping; a listing longer than the pipe
/// capacity therefore cannot wedge the child against a full pipe.
pub(crate) fn discover(image: &Image) -> Result<AppletCatalog, LoadError> {
    let (read_end, write_end) = nix::unistd::pipe().map_err(LoadError::ListingPipe)?;
    let argv = [image.name(), LISTING_FLAG];
    let mut child = invoke::spawn(image.entry(), &argv, Some(write_end.as_fd()), None)?;
    drop(write_end);

    let mut names = Vec::new();
    let mut read_err = None;
    let mut lines = NonEmptyLines::new(File::from(read_end));
    for line in &mut lines {
        match line {
            Ok(name) => names.push(name),
            Err(e) => {
                read_err = Some(e);
                break;
            }
        }
    }
    // Close the read end before reaping: if draining stopped early the
    // child must not block writing into a full pipe we will never read.
    drop(lines);

    let code = child.wait()?;
    if let Some(e) = read_err {
        return Err(LoadError::ListingRead(e));
    }
    if code != 0 {
        tracing::warn!(code, image = image.name(), "applet listing exited non-zero");
        return Err(LoadError::ListingFailed { code });
    }
    Ok(AppletCatalog { names })
}
