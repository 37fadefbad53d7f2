//! `SQLite` database for the Xornet fleet backend.

xornet_core::define_database!(FleetDatabase, "Fleet database migrations complete");
