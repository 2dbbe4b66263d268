#![warn(clippy::nursery, clippy::pedantic)]
#![deny(unsafe_code)]

// Pastelite CLI Client
// Copyright (C) 2026  Pastelite Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use atty::Stream;
use clap::Parser;
use pastelite_common::{CreatePaste, CreatedPaste, ErrorBody, PasteUrl, PasteView, Url, PASTES_ENDPOINT};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

#[derive(Parser)]
struct Opts {
    #[clap(subcommand)]
    action: Action,
}

#[derive(Parser)]
enum Action {
    Upload {
        /// The Pastelite instance to upload to.
        url: Url,
        /// Seconds until the paste expires.
        #[clap(short, long)]
        ttl: Option<u64>,
        /// Number of times the paste may be viewed.
        #[clap(short, long)]
        max_views: Option<u64>,
        /// File to upload. Reads stdin when omitted.
        path: Option<PathBuf>,
    },
    Get {
        /// The paste to fetch. Consumes one view.
        url: PasteUrl,
    },
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    match opts.action {
        Action::Upload {
            url,
            ttl,
            max_views,
            path,
        } => handle_upload(url, ttl, max_views, path),
        Action::Get { url } => handle_get(&url),
    }?;

    Ok(())
}

fn handle_upload(
    mut url: Url,
    ttl_seconds: Option<u64>,
    max_views: Option<u64>,
    path: Option<PathBuf>,
) -> Result<()> {
    let content = if let Some(path) = path {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        if atty::is(Stream::Stdin) {
            bail!("No file given and stdin is a terminal. Pipe in the paste content.");
        }
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        content
    };

    if content.trim().is_empty() {
        bail!("Refusing to upload an empty paste.");
    }

    url.set_fragment(None);
    url.set_query(None);
    let path = format!("{}{}", url.path().trim_end_matches('/'), PASTES_ENDPOINT);
    url.set_path(&path);

    let res = Client::new()
        .post(url)
        .json(&CreatePaste {
            content,
            ttl_seconds,
            max_views,
        })
        .send()
        .context("Request to server failed")?;

    if res.status() != StatusCode::CREATED {
        bail!("Upload failed: {}", error_message(res));
    }

    let created: CreatedPaste = res.json().context("Server sent an unexpected response")?;
    println!("{}", created.url);

    Ok(())
}

fn handle_get(url: &PasteUrl) -> Result<()> {
    let res = Client::new()
        .get(url.api_url())
        .send()
        .context("Failed to get data")?;

    match res.status() {
        StatusCode::OK => (),
        StatusCode::NOT_FOUND => {
            bail!("Paste not found. It may have expired, run out of views, or never existed.")
        }
        _ => bail!("Got bad response from server: {}", error_message(res)),
    }

    let paste: PasteView = res.json().context("Server sent an unexpected response")?;
    std::io::stdout().write_all(paste.content.as_bytes())?;
    if atty::is(Stream::Stdout) && !paste.content.ends_with('\n') {
        println!();
    }

    eprintln!("{}", paste.summary());

    Ok(())
}

fn error_message(res: Response) -> String {
    let status = res.status();
    res.json::<ErrorBody>()
        .map_or_else(|_| status.to_string(), |body| format!("{} ({})", body, status))
}
