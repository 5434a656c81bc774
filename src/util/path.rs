/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2025 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{env, path::PathBuf};

use crate::{Error, Result};

/// Returns the path to the user's home directory, from `$HOME`.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").and_then(|h| if h.is_empty() { None } else { Some(h) }).map(PathBuf::from)
}

/// Expand a leading `~` into the user's home directory.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    if let Some(remains) = path.strip_prefix("~/") {
        let Some(homedir) = home_dir() else {
            return Err(Error::Custom("Could not fetch path for home directory".to_string()))
        };
        return Ok(homedir.join(remains))
    }

    if path == "~" {
        return home_dir()
            .ok_or_else(|| Error::Custom("Could not fetch path for home directory".to_string()))
    }

    Ok(PathBuf::from(path))
}
