//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `stories`, `chapters`, `licensed_stories`,
//! `ebooks`, `advertisements`, and `users`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Stories
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS stories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    author      TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    cover_url   TEXT NOT NULL DEFAULT '',
    genres      TEXT NOT NULL DEFAULT '',     -- comma-joined tag list
    status      TEXT NOT NULL DEFAULT 'ongoing',
    views       INTEGER NOT NULL DEFAULT 0,
    created_at  INTEGER NOT NULL,             -- unix seconds
    updated_at  INTEGER NOT NULL
);

-- ----------------------------------------------------------------
-- Chapters
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chapters (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    story_id   INTEGER NOT NULL,              -- FK -> stories(id)
    title      TEXT NOT NULL,
    content    TEXT NOT NULL DEFAULT '',
    slug       TEXT NOT NULL UNIQUE,
    number     INTEGER NOT NULL,              -- dense 1..N per story
    views      INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER,                       -- nullable; read path fills
    updated_at INTEGER,

    FOREIGN KEY (story_id) REFERENCES stories(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chapters_story_number
    ON chapters(story_id, number ASC);

-- ----------------------------------------------------------------
-- Licensed stories (published externally, no chapters)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS licensed_stories (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    title          TEXT NOT NULL,
    slug           TEXT NOT NULL UNIQUE,
    author         TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    cover_url      TEXT NOT NULL DEFAULT '',
    genres         TEXT NOT NULL DEFAULT '',
    purchase_links TEXT NOT NULL DEFAULT '[]', -- JSON [{store, url}]
    views          INTEGER NOT NULL DEFAULT 0,
    created_at     INTEGER NOT NULL,
    updated_at     INTEGER NOT NULL
);

-- ----------------------------------------------------------------
-- Ebooks
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ebooks (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    title          TEXT NOT NULL,
    slug           TEXT NOT NULL UNIQUE,
    author         TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    cover_url      TEXT NOT NULL DEFAULT '',
    genres         TEXT NOT NULL DEFAULT '',
    purchase_links TEXT NOT NULL DEFAULT '[]', -- JSON [{store, url}]
    views          INTEGER NOT NULL DEFAULT 0,
    created_at     INTEGER NOT NULL,
    updated_at     INTEGER NOT NULL
);

-- ----------------------------------------------------------------
-- Advertisements
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS advertisements (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    image_url     TEXT NOT NULL DEFAULT '',
    affiliate_url TEXT NOT NULL DEFAULT '',
    impressions   INTEGER NOT NULL DEFAULT 0,
    clicks        INTEGER NOT NULL DEFAULT 0,
    active        INTEGER NOT NULL DEFAULT 1,  -- boolean 0/1
    frequency     INTEGER NOT NULL DEFAULT 1,  -- show every N chapters
    kind          TEXT NOT NULL DEFAULT 'other'
);

-- ----------------------------------------------------------------
-- Admin users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'editor'
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
